//! # Session Module
//!
//! One graph, its ingestion pipeline and its metrics recorder, driven as a
//! unit.
//!
//! The session is the single writer of its graph. Producers that run
//! concurrently share it behind one lock; every method here is synchronous
//! and never blocks on I/O, except `record_metrics` when a sink is attached.

use crate::graph::BoundedGraph;
use crate::ingestor::{BatchReport, IngestionPipeline};
use crate::primitives::{DEFAULT_BATCH_SIZE, DEFAULT_CAPACITY, DEFAULT_HISTORY_LIMIT};
use crate::system::{MetricsRecorder, MetricsSink, MetricsSnapshot};
use crate::{GraphError, GraphSnapshot, RawRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Sizing of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum number of nodes held at once.
    pub capacity: usize,
    /// Buffered records that trigger a flush.
    pub batch_size: usize,
    /// Metrics samples kept in memory; `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Seed for generated coordinates; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            batch_size: DEFAULT_BATCH_SIZE,
            history_limit: Some(DEFAULT_HISTORY_LIMIT),
            seed: None,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// A graph together with the machinery that feeds and samples it.
#[derive(Debug, Default)]
pub struct Session {
    graph: BoundedGraph,
    pipeline: IngestionPipeline,
    recorder: MetricsRecorder,
}

impl Session {
    /// Create a session with default sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session from explicit sizing.
    pub fn with_config(config: SessionConfig) -> Result<Self, GraphError> {
        let graph = match config.seed {
            Some(seed) => BoundedGraph::with_seed(config.capacity, seed)?,
            None => BoundedGraph::new(config.capacity)?,
        };
        Ok(Self {
            graph,
            pipeline: IngestionPipeline::new(config.batch_size),
            recorder: MetricsRecorder::new(config.history_limit),
        })
    }

    /// Forward every metrics sample to `sink`.
    #[must_use]
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.recorder.set_sink(Some(sink));
        self
    }

    // =========================================================================
    // ACCESS
    // =========================================================================

    #[must_use]
    pub fn graph(&self) -> &BoundedGraph {
        &self.graph
    }

    /// Mutable graph access for callers that bypass the pipeline.
    pub fn graph_mut(&mut self) -> &mut BoundedGraph {
        &mut self.graph
    }

    /// Records buffered and not yet applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pipeline.pending()
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.pipeline.batch_size()
    }

    /// Metrics samples, oldest first.
    pub fn metrics_history(&self) -> impl Iterator<Item = &MetricsSnapshot> {
        self.recorder.history()
    }

    #[must_use]
    pub fn latest_metrics(&self) -> Option<&MetricsSnapshot> {
        self.recorder.latest()
    }

    /// Sink metrics samples are forwarded to, if any.
    #[must_use]
    pub fn metrics_sink(&self) -> Option<Arc<dyn MetricsSink>> {
        self.recorder.sink()
    }

    // =========================================================================
    // INGESTION
    // =========================================================================

    /// Buffer one record; applies the batch if it is now full.
    pub fn submit(
        &mut self,
        record: impl Into<RawRecord>,
    ) -> Result<Option<BatchReport>, GraphError> {
        self.pipeline.submit(&mut self.graph, record)
    }

    /// Buffer one JSON text line.
    ///
    /// The line is validated only when its batch is applied. Invalid UTF-8
    /// is replaced rather than rejected so the failure shows up in the
    /// batch report like any other malformed record.
    pub fn submit_line(&mut self, line: &[u8]) -> Result<Option<BatchReport>, GraphError> {
        let text = String::from_utf8_lossy(line).into_owned();
        self.submit(RawRecord::Text(text))
    }

    /// Apply whatever is buffered.
    pub fn flush(&mut self) -> Result<BatchReport, GraphError> {
        self.pipeline.flush(&mut self.graph)
    }

    // =========================================================================
    // METRICS
    // =========================================================================

    /// Sample the graph and forward the sample to the sink, if any.
    pub fn record_metrics(&mut self) -> Result<MetricsSnapshot, GraphError> {
        self.recorder.record(&self.graph)
    }

    /// Sample the graph into the history only. The caller is responsible for
    /// handing the sample to [`metrics_sink`](Self::metrics_sink) if needed.
    pub fn sample_metrics(&mut self) -> MetricsSnapshot {
        self.recorder.sample(&self.graph)
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Owned copy of the graph's nodes and edges.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        self.graph.snapshot()
    }

    /// Replace the graph with `snapshot`.
    ///
    /// Records still buffered are discarded: they were produced against the
    /// graph being replaced.
    pub fn restore(&mut self, snapshot: GraphSnapshot) {
        let dropped = self.pipeline.discard();
        if dropped > 0 {
            tracing::warn!(dropped, "discarding buffered records on restore");
        }
        let (nodes, edges) = (snapshot.nodes.len(), snapshot.edges.len());
        self.graph.restore(snapshot);
        tracing::info!(nodes, edges, "graph restored");
    }

    /// Drop every node, edge and buffered record.
    pub fn reset(&mut self) {
        self.pipeline.discard();
        self.graph.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemorySnapshotStore, SnapshotStore};
    use serde_json::json;

    fn session(capacity: usize, batch_size: usize) -> Session {
        Session::with_config(SessionConfig {
            capacity,
            batch_size,
            history_limit: None,
            seed: Some(11),
        })
        .expect("session")
    }

    #[test]
    fn default_session_uses_default_sizing() {
        let s = Session::new();
        assert_eq!(s.graph().capacity(), DEFAULT_CAPACITY);
        assert_eq!(s.batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn zero_capacity_config_rejected() {
        let config = SessionConfig {
            capacity: 0,
            ..SessionConfig::default()
        };
        assert!(Session::with_config(config).is_err());
    }

    #[test]
    fn submit_and_flush() {
        let mut s = session(10, 5);
        for _ in 0..3 {
            assert!(s.submit(json!({"event": "add_node"})).expect("submit").is_none());
        }
        assert_eq!(s.pending(), 3);

        let report = s.flush().expect("flush");
        assert_eq!(report.applied, 3);
        assert_eq!(s.graph().node_count(), 3);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn submit_line_defers_parsing() {
        let mut s = session(10, 2);
        assert!(s.submit_line(br#"{"event":"add_node"}"#).expect("submit").is_none());
        let report = s
            .submit_line(b"\xff\xfe")
            .expect("submit")
            .expect("flushed");
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn record_metrics_appends_history() {
        let mut s = session(10, 1);
        s.submit(json!({"event": "add_node"})).expect("submit");
        let sample = s.record_metrics().expect("record");
        assert_eq!(sample.total_nodes, 1);
        assert_eq!(s.metrics_history().count(), 1);
        assert_eq!(s.latest_metrics(), Some(&sample));
    }

    #[test]
    fn save_clear_restore_roundtrip() {
        let mut s = session(10, 1);
        for _ in 0..6 {
            s.submit(json!({"event": "add_node"})).expect("submit");
        }
        s.graph_mut().derive_edges_full();

        let store = MemorySnapshotStore::new();
        let saved = s.snapshot();
        store.save(&saved).expect("save");

        s.reset();
        assert!(s.graph().is_empty());

        s.restore(store.load().expect("load"));
        assert_eq!(s.snapshot(), saved);
        assert!(s.graph().nodes().iter().all(|n| n.connections.is_empty()));
    }

    #[test]
    fn restore_discards_pending_records() {
        let mut s = session(10, 10);
        s.submit(json!({"event": "add_node"})).expect("submit");
        s.restore(GraphSnapshot::default());
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn new_ids_continue_after_restore() {
        let mut s = session(10, 1);
        for _ in 0..3 {
            s.submit(json!({"event": "add_node"})).expect("submit");
        }
        let saved = s.snapshot();
        s.reset();
        s.restore(saved);

        let report = s
            .submit(json!({"event": "add_node"}))
            .expect("submit")
            .expect("flushed");
        assert_eq!(report.created[0].as_str(), "N5");
    }
}
