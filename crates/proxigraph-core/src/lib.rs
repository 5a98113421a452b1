//! # proxigraph-core
//!
//! The bounded proximity graph engine for Proxigraph.
//!
//! A [`BoundedGraph`] holds at most `capacity` positioned nodes. Edges are
//! derived from how close nodes are to each other, never stated directly.
//! When the graph is full the least recently used node is evicted along
//! with every edge that touches it.
//!
//! Event records stream in through an [`IngestionPipeline`], which buffers
//! them and applies them in batches; a [`MetricsRecorder`] samples connection
//! statistics; a [`SnapshotStore`] saves and restores the whole graph.
//! [`Session`] bundles the three.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Single writer per graph: every mutation takes `&mut self`
//! - Capacity is an invariant: `node_count() <= capacity()` after every
//!   public mutation

// =============================================================================
// MODULES
// =============================================================================

pub mod decoder;
pub mod formats;
pub mod geometry;
pub mod graph;
pub mod ingestor;
pub mod primitives;
pub mod session;
pub mod storage;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    DecodeError, Edge, Event, GraphError, GraphSnapshot, Node, NodeId, NodeRecord, RawRecord,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use decoder::EventDecoder;
pub use geometry::distance;
pub use graph::{BoundedGraph, GraphMetrics};
pub use ingestor::{BatchReport, IngestionPipeline, RecordFailure};
pub use session::{Session, SessionConfig};

// =============================================================================
// RE-EXPORTS: Storage & Formats
// =============================================================================

pub use formats::{PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes};
pub use storage::{FileSnapshotStore, MemorySnapshotStore, RedbSnapshotStore, SnapshotStore};

// =============================================================================
// RE-EXPORTS: System
// =============================================================================

pub use system::{MetricsRecorder, MetricsSink, MetricsSnapshot};
