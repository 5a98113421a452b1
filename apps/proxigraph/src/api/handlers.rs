//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        AnomaliesQuery, AnomaliesResponse, BatchReportJson, ClusterJson, ClustersResponse,
        EventsResponse, FlushResponse, GraphResponse, HealthResponse, MetricsHistoryResponse,
        MetricsResponse, NodeJson, SnapshotResponse,
    },
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use proxigraph_core::primitives::MAX_RECORDS_PER_SUBMIT;
use proxigraph_core::{BatchReport, GraphError};
use serde_json::Value;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// EVENTS HANDLER
// =============================================================================

/// Submit one event record, or an array of records, to the pipeline.
///
/// Every record is buffered; batches are applied as they fill. The response
/// carries the graph as it stands afterwards.
pub async fn events_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let records = match body {
        Value::Array(items) => items,
        single => vec![single],
    };

    if records.len() > MAX_RECORDS_PER_SUBMIT {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(EventsResponse::error(format!(
                "Record count {} exceeds maximum {}",
                records.len(),
                MAX_RECORDS_PER_SUBMIT
            ))),
        );
    }

    let accepted = records.len();
    let mut session = state.session.write().await;
    let mut combined: Option<BatchReport> = None;

    for record in records {
        match session.submit(record) {
            Ok(Some(report)) => match combined.as_mut() {
                Some(total) => total.merge(report),
                None => combined = Some(report),
            },
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "event submission failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(EventsResponse::error(format!("Ingestion failed: {}", e))),
                );
            }
        }
    }

    let response = EventsResponse::success(
        accepted,
        session.pending(),
        combined.map(BatchReportJson::from),
        GraphResponse::from(session.graph()),
    );
    (StatusCode::OK, Json(response))
}

// =============================================================================
// FLUSH HANDLER
// =============================================================================

/// Apply every buffered record now.
pub async fn flush_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    match session.flush() {
        Ok(report) => (
            StatusCode::OK,
            Json(FlushResponse::success(BatchReportJson::from(report))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(FlushResponse::error(format!("Flush failed: {}", e))),
        ),
    }
}

// =============================================================================
// READ HANDLERS
// =============================================================================

/// All nodes and edges.
pub async fn graph_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(GraphResponse::from(session.graph()))
}

/// Current connection statistics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let graph = session.graph();
    let metrics = graph.metrics();

    Json(MetricsResponse {
        total_nodes: metrics.total_nodes,
        total_edges: metrics.total_edges,
        max_connections: metrics.max_connections,
        avg_connections: metrics.avg_connections,
        capacity: graph.capacity(),
        pending: session.pending(),
    })
}

/// Recorded metrics samples.
pub async fn metrics_history_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(MetricsHistoryResponse {
        samples: session.metrics_history().cloned().collect(),
    })
}

/// Nodes with more connections than `threshold`.
pub async fn anomalies_handler(
    State(state): State<AppState>,
    Query(query): Query<AnomaliesQuery>,
) -> impl IntoResponse {
    let threshold = query.threshold.unwrap_or(state.anomaly_threshold);
    let session = state.session.read().await;

    Json(AnomaliesResponse {
        threshold,
        nodes: session
            .graph()
            .anomalies(threshold)
            .into_iter()
            .map(NodeJson::from)
            .collect(),
    })
}

/// Nodes grouped by `number mod 5`.
pub async fn clusters_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let clusters = session
        .graph()
        .cluster_nodes()
        .into_iter()
        .map(|(bucket, nodes)| ClusterJson {
            bucket,
            nodes: nodes.iter().map(|n| n.id.to_string()).collect(),
        })
        .collect();

    Json(ClustersResponse { clusters })
}

// =============================================================================
// SNAPSHOT HANDLERS
// =============================================================================

/// Save the graph to the configured store.
pub async fn snapshot_save_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.store.is_none() {
        return no_store_response();
    }
    match state.save_snapshot().await {
        Ok((nodes, edges)) => (StatusCode::OK, Json(SnapshotResponse::success(nodes, edges))),
        Err(e) => snapshot_failure("Snapshot save failed", &e),
    }
}

/// Replace the graph with the stored snapshot.
pub async fn snapshot_restore_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.store.is_none() {
        return no_store_response();
    }
    match state.restore_snapshot().await {
        Ok((nodes, edges)) => (StatusCode::OK, Json(SnapshotResponse::success(nodes, edges))),
        Err(e) => snapshot_failure("Snapshot restore failed", &e),
    }
}

fn no_store_response() -> (StatusCode, Json<SnapshotResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(SnapshotResponse::error("No snapshot store configured")),
    )
}

fn snapshot_failure(context: &str, e: &GraphError) -> (StatusCode, Json<SnapshotResponse>) {
    tracing::error!(error = %e, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(SnapshotResponse::error(format!("{}: {}", context, e))),
    )
}
