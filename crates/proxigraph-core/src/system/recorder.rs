use crate::graph::{BoundedGraph, GraphMetrics};
use crate::primitives::DEFAULT_HISTORY_LIMIT;
use crate::GraphError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Graph statistics stamped with the time they were taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub total_nodes: usize,
    pub total_edges: usize,
    pub avg_connections: f64,
    pub max_connections: usize,
}

impl MetricsSnapshot {
    #[must_use]
    pub fn new(metrics: GraphMetrics, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            total_nodes: metrics.total_nodes,
            total_edges: metrics.total_edges,
            avg_connections: metrics.avg_connections,
            max_connections: metrics.max_connections,
        }
    }
}

// =============================================================================
// SINK
// =============================================================================

/// Append-only destination for metrics samples.
pub trait MetricsSink: Send + Sync {
    /// Persist one sample.
    fn write(&self, snapshot: &MetricsSnapshot) -> Result<(), GraphError>;
}

// =============================================================================
// RECORDER
// =============================================================================

/// Samples graph metrics into a bounded history.
pub struct MetricsRecorder {
    history: VecDeque<MetricsSnapshot>,
    /// Maximum samples kept; `None` keeps everything.
    history_limit: Option<usize>,
    sink: Option<Arc<dyn MetricsSink>>,
}

impl std::fmt::Debug for MetricsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsRecorder")
            .field("history_len", &self.history.len())
            .field("history_limit", &self.history_limit)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new(Some(DEFAULT_HISTORY_LIMIT))
    }
}

impl MetricsRecorder {
    /// Create a recorder keeping at most `history_limit` samples.
    #[must_use]
    pub fn new(history_limit: Option<usize>) -> Self {
        Self {
            history: VecDeque::new(),
            history_limit,
            sink: None,
        }
    }

    /// Forward every future sample to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Option<Arc<dyn MetricsSink>>) {
        self.sink = sink;
    }

    /// Sink samples are forwarded to, if any.
    #[must_use]
    pub fn sink(&self) -> Option<Arc<dyn MetricsSink>> {
        self.sink.clone()
    }

    /// Sample `graph` now and append the sample to the history.
    ///
    /// The sample stays in the history even when the sink write fails; the
    /// sink error is what gets returned.
    pub fn record(&mut self, graph: &BoundedGraph) -> Result<MetricsSnapshot, GraphError> {
        let snapshot = self.sample(graph);
        if let Some(sink) = &self.sink {
            sink.write(&snapshot)?;
        }
        Ok(snapshot)
    }

    /// Sample `graph` into the history without touching the sink.
    ///
    /// Lets a caller that holds a lock on the graph take the sample, release
    /// the lock, and only then do the sink write.
    pub fn sample(&mut self, graph: &BoundedGraph) -> MetricsSnapshot {
        let snapshot = MetricsSnapshot::new(graph.metrics(), Utc::now());
        self.push(snapshot.clone());
        snapshot
    }

    fn push(&mut self, snapshot: MetricsSnapshot) {
        if self.history_limit == Some(0) {
            return;
        }
        self.history.push_back(snapshot);
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// Recorded samples, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &MetricsSnapshot> {
        self.history.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&MetricsSnapshot> {
        self.history.back()
    }
}

// =============================================================================
// TESTS
// =============================================================================
