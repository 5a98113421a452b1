//! # Core Type Definitions
//!
//! This module contains all core types for the Proxigraph engine:
//! - Node identity (`NodeId`) and the stored graph elements (`Node`, `Edge`)
//! - The persisted shape of a node (`NodeRecord`) and of a whole graph (`GraphSnapshot`)
//! - Raw input (`RawRecord`) and its decoded form (`Event`)
//! - Error types (`GraphError`, `DecodeError`)
//!
//! ## Identity Guarantees
//!
//! - A `NodeId` is always `"N" + number`, derived by the graph at insert time
//! - Node numbers are handed out by a strictly increasing counter and are
//!   never reused within the lifetime of a graph instance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTIFIER
// =============================================================================

/// Identifier of a node inside a graph, formatted as `N<number>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Build the identifier the graph assigns to node `number`.
    #[must_use]
    pub fn from_number(number: u64) -> Self {
        Self(format!("N{}", number))
    }

    /// Wrap an identifier received from outside (event payloads, storage).
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// NODE
// =============================================================================

/// A positioned vertex of the graph.
///
/// Nodes are only ever created by [`BoundedGraph::insert_node`] (or rebuilt by
/// a restore) and only ever destroyed by eviction or `clear()`.
///
/// [`BoundedGraph::insert_node`]: crate::graph::BoundedGraph::insert_node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// `N<number>`.
    pub id: NodeId,
    /// Monotonic sequence number the id is derived from.
    pub number: u64,
    pub x: f64,
    pub y: f64,
    /// Outgoing proximity links recorded by edge derivation.
    /// Never contains `id` itself and never contains duplicates.
    pub connections: Vec<NodeId>,
    /// Eviction rank. Set at creation; refreshed only through `touch`.
    pub last_used: DateTime<Utc>,
}

impl Node {
    pub(crate) fn new(number: u64, x: f64, y: f64, last_used: DateTime<Utc>) -> Self {
        Self {
            id: NodeId::from_number(number),
            number,
            x,
            y,
            connections: Vec::new(),
            last_used,
        }
    }

    /// Number of outgoing proximity links.
    #[must_use]
    pub fn degree(&self) -> usize {
        self.connections.len()
    }

    /// Whether `target` is already recorded as a connection of this node.
    #[must_use]
    pub fn is_connected_to(&self, target: &NodeId) -> bool {
        self.connections.contains(target)
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// A directed, distance-annotated link between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    /// Euclidean distance between the endpoints at creation time, always >= 0.
    pub distance: f64,
}

impl Edge {
    #[must_use]
    pub fn new(source: NodeId, target: NodeId, distance: f64) -> Self {
        Self {
            source,
            target,
            distance,
        }
    }

    /// Whether either endpoint is `id`.
    #[must_use]
    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }
}

// =============================================================================
// PERSISTED SHAPES
// =============================================================================

/// The persisted part of a node.
///
/// Connections and the eviction timestamp are runtime state and are not
/// stored: a restored node starts with no connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    pub number: u64,
    pub x: f64,
    pub y: f64,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            number: node.number,
            x: node.x,
            y: node.y,
        }
    }
}

/// Full node and edge sets, saved and loaded as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    /// Check if the snapshot holds no nodes and no edges.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

// =============================================================================
// INPUT
// =============================================================================

/// A record as it arrives from a producer, before decoding.
///
/// Text records are kept verbatim in the batch buffer so that a line which is
/// not even valid JSON fails on its own at flush time, like any other
/// undecodable record.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// Already-parsed JSON (e.g. from an HTTP body).
    Json(serde_json::Value),
    /// One JSON text, not yet parsed (e.g. a log line).
    Text(String),
}

impl From<serde_json::Value> for RawRecord {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for RawRecord {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RawRecord {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A decoded event. The set of event kinds is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Create a node at a random position. `requested_id` is the `id` field
    /// of the record, if any; it is informational only, the graph always
    /// assigns a fresh id.
    CreateNode { requested_id: Option<String> },
    /// Link two existing nodes if they are close enough.
    Connect { source: NodeId, target: NodeId },
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Why a single record could not be turned into an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The `event` field names a kind this engine does not know.
    #[error("Unknown event type: {0}")]
    UnknownKind(String),

    /// A field required for this record is absent or not a string.
    #[error("Missing or invalid field: {0}")]
    MissingField(&'static str),

    /// The record is not a JSON object (or not JSON at all).
    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Errors that can occur in the Proxigraph engine.
///
/// Per-record failures (`Decode`, `MissingEndpoint`) are collected by the
/// ingestion pipeline and never abort a batch. `Sink` and the I/O variants
/// are returned to whoever triggered the operation. `CapacityInvariantViolation`
/// means the engine itself is broken.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A record could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A `Connect` event names a node that does not exist.
    #[error("Source or target node not found for edge: {from} -> {to}")]
    MissingEndpoint { from: NodeId, to: NodeId },

    /// The requested node was not found in the graph.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Capacity must be at least one node.
    #[error("Invalid capacity: {0} (must be > 0)")]
    InvalidCapacity(usize),

    /// An insert would have left more nodes than the capacity allows.
    #[error("Capacity invariant violated: {len} nodes with capacity {capacity}")]
    CapacityInvariantViolation { capacity: usize, len: usize },

    /// A snapshot store or metrics sink failed.
    #[error("Sink error: {0}")]
    Sink(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl GraphError {
    /// Whether this error is local to one record of a batch.
    #[must_use]
    pub fn is_record_local(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::MissingEndpoint { .. })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_is_derived_from_number() {
        assert_eq!(NodeId::from_number(2).as_str(), "N2");
        assert_eq!(NodeId::from_number(1234).to_string(), "N1234");
    }

    #[test]
    fn node_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&NodeId::from_number(7)).expect("serialize");
        assert_eq!(json, "\"N7\"");
    }

    #[test]
    fn new_node_has_no_connections() {
        let node = Node::new(5, 1.0, 2.0, Utc::now());
        assert_eq!(node.id, NodeId::new("N5"));
        assert_eq!(node.degree(), 0);
        assert!(!node.is_connected_to(&NodeId::new("N6")));
    }

    #[test]
    fn edge_touches_both_endpoints() {
        let edge = Edge::new(NodeId::new("N2"), NodeId::new("N3"), 10.0);
        assert!(edge.touches(&NodeId::new("N2")));
        assert!(edge.touches(&NodeId::new("N3")));
        assert!(!edge.touches(&NodeId::new("N4")));
    }

    #[test]
    fn record_keeps_position_but_drops_runtime_state() {
        let mut node = Node::new(3, 40.0, 50.0, Utc::now());
        node.connections.push(NodeId::new("N4"));

        let record = NodeRecord::from(&node);
        assert_eq!(record.id, node.id);
        assert_eq!(record.number, 3);
        assert_eq!((record.x, record.y), (40.0, 50.0));
    }

    #[test]
    fn record_local_errors() {
        assert!(GraphError::Decode(DecodeError::UnknownKind("x".into())).is_record_local());
        assert!(
            GraphError::MissingEndpoint {
                from: NodeId::new("N1"),
                to: NodeId::new("N2"),
            }
            .is_record_local()
        );
        assert!(!GraphError::Sink("disk full".into()).is_record_local());
    }

    #[test]
    fn unknown_kind_message_names_the_kind() {
        let err = DecodeError::UnknownKind("unknown_event".into());
        assert_eq!(err.to_string(), "Unknown event type: unknown_event");
    }
}
