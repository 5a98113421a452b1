//! # Ingestor Module
//!
//! Batched ingestion of raw event records into a [`BoundedGraph`].
//!
//! - Records are buffered verbatim and decoded only when the batch is applied
//! - A batch is applied when the buffer reaches `batch_size`, or on an
//!   explicit `flush`
//! - A record that fails (undecodable, missing endpoint) is logged and
//!   reported; it never aborts the rest of the batch
//! - The buffer is empty after every flush, whatever happened inside it

use crate::decoder::EventDecoder;
use crate::graph::BoundedGraph;
use crate::primitives::DEFAULT_BATCH_SIZE;
use crate::{Event, GraphError, NodeId, RawRecord};

// =============================================================================
// BATCH REPORT
// =============================================================================

/// A record of a batch that could not be applied.
#[derive(Debug)]
pub struct RecordFailure {
    /// Position of the record inside its batch.
    pub index: usize,
    /// Why it failed.
    pub error: GraphError,
}

/// Outcome of applying one batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of records applied without error.
    pub applied: usize,
    /// Ids of nodes created by the batch, in creation order. Some of them may
    /// already have been evicted again by later records of the same batch.
    pub created: Vec<NodeId>,
    /// Number of edges added by the batch.
    pub edges_added: usize,
    /// Records that failed, in batch order.
    pub failures: Vec<RecordFailure>,
}

impl BatchReport {
    /// Total number of records the batch contained.
    #[must_use]
    pub fn total(&self) -> usize {
        self.applied + self.failures.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: BatchReport) {
        let offset = self.total();
        self.applied += other.applied;
        self.created.extend(other.created);
        self.edges_added += other.edges_added;
        self.failures
            .extend(other.failures.into_iter().map(|f| RecordFailure {
                index: f.index + offset,
                error: f.error,
            }));
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Buffers raw records and applies them to a graph in batches.
#[derive(Debug)]
pub struct IngestionPipeline {
    buffer: Vec<RawRecord>,
    batch_size: usize,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self {
            buffer: Vec::with_capacity(DEFAULT_BATCH_SIZE),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl IngestionPipeline {
    /// Create a pipeline flushing every `batch_size` records.
    ///
    /// A `batch_size` of 0 is treated as 1 (every record applied at once).
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            buffer: Vec::with_capacity(batch_size),
            batch_size,
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of records waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer a record, flushing if the buffer is full.
    ///
    /// Returns the report of the batch this record completed, if any.
    pub fn submit(
        &mut self,
        graph: &mut BoundedGraph,
        record: impl Into<RawRecord>,
    ) -> Result<Option<BatchReport>, GraphError> {
        self.buffer.push(record.into());
        if self.buffer.len() >= self.batch_size {
            return self.flush(graph).map(Some);
        }
        Ok(None)
    }

    /// Apply every buffered record, in order, and empty the buffer.
    ///
    /// Only an engine fault (`CapacityInvariantViolation`) is returned as an
    /// error; the records after it are dropped with the rest of the buffer.
    pub fn flush(&mut self, graph: &mut BoundedGraph) -> Result<BatchReport, GraphError> {
        let batch = std::mem::take(&mut self.buffer);
        let mut report = BatchReport::default();

        for (index, record) in batch.iter().enumerate() {
            let outcome = EventDecoder::decode_raw(record)
                .map_err(GraphError::from)
                .and_then(|event| Self::apply(graph, event, &mut report));

            match outcome {
                Ok(()) => report.applied += 1,
                Err(error) if error.is_record_local() => {
                    tracing::warn!(index, %error, "skipping event record");
                    report.failures.push(RecordFailure { index, error });
                }
                Err(error) => return Err(error),
            }
        }

        tracing::debug!(
            applied = report.applied,
            failed = report.failures.len(),
            edges_added = report.edges_added,
            nodes = graph.node_count(),
            "batch applied"
        );
        Ok(report)
    }

    /// Drop buffered records without applying them.
    pub fn discard(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        dropped
    }

    fn apply(
        graph: &mut BoundedGraph,
        event: Event,
        report: &mut BatchReport,
    ) -> Result<(), GraphError> {
        match event {
            Event::CreateNode { requested_id } => {
                let node = graph.insert_node(None, None)?;
                if let Some(requested) = requested_id {
                    tracing::debug!(requested = %requested, assigned = %node.id, "node id reassigned");
                }
                report.edges_added += graph.derive_edges_incremental(&node.id)?;
                report.created.push(node.id);
            }
            Event::Connect { source, target } => {
                if graph.connect(&source, &target)?.is_some() {
                    report.edges_added += 1;
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
