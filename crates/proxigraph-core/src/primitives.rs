//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Proxigraph engine.
//!
//! ## Primitives
//!
//! 1. **Proximity Primitive**: how close two nodes must be to be linked.
//! 2. **Canvas Primitive**: where generated nodes are placed.
//! 3. **Identity Primitive**: where node numbering starts.
//! 4. **Format Primitive**: snapshot file header.

/// Maximum distance (exclusive) at which a full derivation pass or a direct
/// `Connect` event links two nodes.
pub const PROXIMITY_THRESHOLD: f64 = 150.0;

/// Maximum distance (exclusive) at which a freshly inserted node is linked
/// to its neighbours. Tighter than [`PROXIMITY_THRESHOLD`] so streaming
/// inserts stay sparse.
pub const INCREMENTAL_THRESHOLD: f64 = 100.0;

/// Width of the canvas generated x coordinates are drawn from: `[0, 800)`.
pub const CANVAS_WIDTH: f64 = 800.0;

/// Height of the canvas generated y coordinates are drawn from: `[0, 600)`.
pub const CANVAS_HEIGHT: f64 = 600.0;

/// Number assigned to the first node of an empty graph (`N2`).
pub const FIRST_NODE_NUMBER: u64 = 2;

/// Number of buckets `cluster_nodes` groups nodes into (`number mod 5`).
pub const CLUSTER_BUCKETS: u64 = 5;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default node capacity of a graph.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default number of buffered records that triggers a flush.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Default connection count above which a node is reported as an anomaly.
pub const DEFAULT_ANOMALY_THRESHOLD: usize = 10;

/// Default number of metrics samples kept in memory.
pub const DEFAULT_HISTORY_LIMIT: usize = 10_000;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the snapshot file header.
pub const MAGIC_BYTES: &[u8; 4] = b"PXGR";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Maximum number of records accepted in one submission call.
pub const MAX_RECORDS_PER_SUBMIT: usize = 10_000;
