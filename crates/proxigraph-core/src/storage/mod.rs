//! # Storage Module
//!
//! Where snapshots go when they leave memory.
//!
//! [`SnapshotStore`] is the contract: `save` replaces everything previously
//! saved with one snapshot, `load` returns the last saved snapshot (or an
//! empty one if nothing was ever saved). Three implementations ship here:
//!
//! - [`MemorySnapshotStore`]: process-local, for tests and ephemeral runs
//! - [`FileSnapshotStore`]: one binary file, replaced atomically
//! - [`RedbSnapshotStore`]: redb tables; also a [`MetricsSink`](crate::MetricsSink)

mod file_store;
mod redb_store;

pub use file_store::FileSnapshotStore;
pub use redb_store::RedbSnapshotStore;

use crate::{GraphError, GraphSnapshot};
use std::sync::{Mutex, PoisonError};

/// Full-overwrite persistence of graph snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Replace the stored snapshot with `snapshot`, as one unit.
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), GraphError>;

    /// Read the stored snapshot. Empty storage yields an empty snapshot.
    fn load(&self) -> Result<GraphSnapshot, GraphError>;
}

/// In-memory [`SnapshotStore`].
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<GraphSnapshot>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), GraphError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = snapshot.clone();
        Ok(())
    }

    fn load(&self) -> Result<GraphSnapshot, GraphError> {
        let guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, NodeId, NodeRecord};

    #[test]
    fn memory_store_starts_empty() {
        let store = MemorySnapshotStore::new();
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn memory_store_overwrites() {
        let store = MemorySnapshotStore::new();
        let first = GraphSnapshot {
            nodes: vec![NodeRecord {
                id: NodeId::new("N2"),
                number: 2,
                x: 1.0,
                y: 1.0,
            }],
            edges: vec![Edge::new(NodeId::new("N2"), NodeId::new("N2"), 0.0)],
        };
        store.save(&first).expect("save");
        store.save(&GraphSnapshot::default()).expect("save");
        assert!(store.load().expect("load").is_empty());
    }
}
