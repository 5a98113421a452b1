//! # Proxigraph HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `POST /events` - Submit one event record or an array of them
//! - `POST /flush` - Apply buffered records now
//! - `GET /graph` - All nodes and edges
//! - `GET /metrics` - Current connection statistics
//! - `GET /metrics/history` - Recorded metrics samples
//! - `GET /anomalies?threshold=N` - Nodes with more than N connections
//! - `GET /clusters` - Nodes grouped by `number mod 5`
//! - `POST /snapshot/save` - Save the graph to the configured store
//! - `POST /snapshot/restore` - Replace the graph with the stored snapshot
//! - `GET /health` - Health check
//!
//! ## Configuration (Environment Variables)
//!
//! - `PROXIGRAPH_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//!
//! ## Locking
//!
//! The session sits behind one `RwLock`. Snapshot and metrics-sink I/O never
//! happens while the lock is held: data is copied out under the guard, the
//! guard is dropped, then the I/O runs on a blocking thread.

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `proxigraph::api::*`)
pub use handlers::{
    anomalies_handler, clusters_handler, events_handler, flush_handler, graph_handler,
    health_handler, metrics_handler, metrics_history_handler, snapshot_restore_handler,
    snapshot_save_handler,
};
pub use types::{
    AnomaliesQuery, AnomaliesResponse, BatchReportJson, ClusterJson, ClustersResponse, EdgeJson,
    EventsResponse, FailureJson, FlushResponse, GraphResponse, HealthResponse,
    MetricsHistoryResponse, MetricsResponse, NodeJson, SnapshotResponse,
};

use crate::config::AppConfig;
use crate::scheduler;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use proxigraph_core::primitives::DEFAULT_ANOMALY_THRESHOLD;
use proxigraph_core::{GraphError, MetricsSnapshot, Session, SnapshotStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the graph session.
#[derive(Clone)]
pub struct AppState {
    /// The session containing the graph.
    pub session: Arc<RwLock<Session>>,
    /// Snapshot destination, if one is configured.
    pub store: Option<Arc<dyn SnapshotStore>>,
    /// Threshold used by `GET /anomalies` when the query names none.
    pub anomaly_threshold: usize,
}

impl AppState {
    /// Create new app state with a session and no snapshot store.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            store: None,
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_anomaly_threshold(mut self, threshold: usize) -> Self {
        self.anomaly_threshold = threshold;
        self
    }

    /// Copy the graph out under a read guard, then save it off the lock.
    ///
    /// Returns the saved node and edge counts.
    pub async fn save_snapshot(&self) -> Result<(usize, usize), GraphError> {
        let store = self.require_store()?;
        let snapshot = self.session.read().await.snapshot();
        let counts = (snapshot.nodes.len(), snapshot.edges.len());

        tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| GraphError::Sink(format!("snapshot task failed: {}", e)))??;
        Ok(counts)
    }

    /// Load the stored snapshot off the lock, then swap it in under a write
    /// guard.
    ///
    /// Returns the restored node and edge counts.
    pub async fn restore_snapshot(&self) -> Result<(usize, usize), GraphError> {
        let store = self.require_store()?;
        let snapshot = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| GraphError::Sink(format!("snapshot task failed: {}", e)))??;

        let mut session = self.session.write().await;
        session.restore(snapshot);
        let graph = session.graph();
        Ok((graph.node_count(), graph.edge_count()))
    }

    /// Sample metrics under the write guard, then hand the sample to the
    /// metrics sink (if any) off the lock.
    pub async fn record_metrics(&self) -> Result<MetricsSnapshot, GraphError> {
        let (sample, sink) = {
            let mut session = self.session.write().await;
            (session.sample_metrics(), session.metrics_sink())
        };

        if let Some(sink) = sink {
            let written = sample.clone();
            tokio::task::spawn_blocking(move || sink.write(&written))
                .await
                .map_err(|e| GraphError::Sink(format!("metrics task failed: {}", e)))??;
        }
        Ok(sample)
    }

    fn require_store(&self) -> Result<Arc<dyn SnapshotStore>, GraphError> {
        self.store
            .clone()
            .ok_or_else(|| GraphError::Sink("no snapshot store configured".to_string()))
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `PROXIGRAPH_CORS_ORIGINS`:
/// - If "*": allows all origins
/// - If not set: localhost only
/// - Otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("PROXIGRAPH_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (PROXIGRAPH_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in PROXIGRAPH_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => build_localhost_cors(),
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/events", post(handlers::events_handler))
        .route("/flush", post(handlers::flush_handler))
        .route("/graph", get(handlers::graph_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/metrics/history", get(handlers::metrics_history_handler))
        .route("/anomalies", get(handlers::anomalies_handler))
        .route("/clusters", get(handlers::clusters_handler))
        .route("/snapshot/save", post(handlers::snapshot_save_handler))
        .route("/snapshot/restore", post(handlers::snapshot_restore_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer())
                .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and its background tasks; returns on Ctrl+C.
///
/// A final snapshot is saved on shutdown when a store is configured.
pub async fn run_server(config: &AppConfig, state: AppState) -> Result<(), GraphError> {
    let addr = config.bind_addr();
    let tasks = scheduler::spawn(
        state.clone(),
        config.metrics_interval(),
        config.snapshot_interval(),
    );
    let router = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GraphError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Proxigraph HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GraphError::IoError(format!("Server error: {}", e)))?;

    tasks.shutdown();

    if state.store.is_some() {
        let (nodes, edges) = state.save_snapshot().await?;
        tracing::info!(nodes, edges, "final snapshot saved");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
