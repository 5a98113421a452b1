//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use proxigraph_core::{BatchReport, BoundedGraph, Edge, MetricsSnapshot, Node};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// A node as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeJson {
    pub id: String,
    pub number: u64,
    pub x: f64,
    pub y: f64,
    pub connections: Vec<String>,
}

impl From<&Node> for NodeJson {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.to_string(),
            number: node.number,
            x: node.x,
            y: node.y,
            connections: node.connections.iter().map(ToString::to_string).collect(),
        }
    }
}

/// An edge as exposed over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeJson {
    pub source: String,
    pub target: String,
    pub distance: f64,
}

impl From<&Edge> for EdgeJson {
    fn from(edge: &Edge) -> Self {
        Self {
            source: edge.source.to_string(),
            target: edge.target.to_string(),
            distance: edge.distance,
        }
    }
}

/// The whole graph: every node and every edge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphResponse {
    pub nodes: Vec<NodeJson>,
    pub edges: Vec<EdgeJson>,
}

impl From<&BoundedGraph> for GraphResponse {
    fn from(graph: &BoundedGraph) -> Self {
        Self {
            nodes: graph.nodes().iter().map(NodeJson::from).collect(),
            edges: graph.edges().iter().map(EdgeJson::from).collect(),
        }
    }
}

// =============================================================================
// BATCH REPORT
// =============================================================================

/// A record that could not be applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureJson {
    pub index: usize,
    pub error: String,
}

/// Outcome of one or more applied batches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReportJson {
    pub applied: usize,
    pub created: Vec<String>,
    pub edges_added: usize,
    pub failures: Vec<FailureJson>,
}

impl From<BatchReport> for BatchReportJson {
    fn from(report: BatchReport) -> Self {
        Self {
            applied: report.applied,
            created: report.created.iter().map(ToString::to_string).collect(),
            edges_added: report.edges_added,
            failures: report
                .failures
                .into_iter()
                .map(|f| FailureJson {
                    index: f.index,
                    error: f.error.to_string(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// EVENTS / FLUSH RESPONSES
// =============================================================================

/// Response to `POST /events`.
///
/// Carries the graph after the submission, whether or not a batch was
/// applied, plus the report of any batch the submission triggered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsResponse {
    pub success: bool,
    /// Records taken from the request body.
    pub accepted: usize,
    /// Records still buffered after this request.
    pub pending: usize,
    pub report: Option<BatchReportJson>,
    pub graph: Option<GraphResponse>,
    pub error: Option<String>,
}

impl EventsResponse {
    pub fn success(
        accepted: usize,
        pending: usize,
        report: Option<BatchReportJson>,
        graph: GraphResponse,
    ) -> Self {
        Self {
            success: true,
            accepted,
            pending,
            report,
            graph: Some(graph),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            accepted: 0,
            pending: 0,
            report: None,
            graph: None,
            error: Some(msg.into()),
        }
    }
}

/// Response to `POST /flush`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushResponse {
    pub success: bool,
    pub report: Option<BatchReportJson>,
    pub error: Option<String>,
}

impl FlushResponse {
    pub fn success(report: BatchReportJson) -> Self {
        Self {
            success: true,
            report: Some(report),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            report: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// ANALYSIS RESPONSES
// =============================================================================

/// Current connection statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub max_connections: usize,
    pub avg_connections: f64,
    pub capacity: usize,
    pub pending: usize,
}

/// Recorded metrics samples, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsHistoryResponse {
    pub samples: Vec<MetricsSnapshot>,
}

/// Query string of `GET /anomalies`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomaliesQuery {
    pub threshold: Option<usize>,
}

/// Nodes with more connections than the threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomaliesResponse {
    pub threshold: usize,
    pub nodes: Vec<NodeJson>,
}

/// One `number mod 5` bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterJson {
    pub bucket: u64,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClustersResponse {
    pub clusters: Vec<ClusterJson>,
}

// =============================================================================
// SNAPSHOT RESPONSE
// =============================================================================

/// Response to `POST /snapshot/save` and `POST /snapshot/restore`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub success: bool,
    pub nodes: usize,
    pub edges: usize,
    pub error: Option<String>,
}

impl SnapshotResponse {
    pub fn success(nodes: usize, edges: usize) -> Self {
        Self {
            success: true,
            nodes,
            edges,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            nodes: 0,
            edges: 0,
            error: Some(msg.into()),
        }
    }
}
