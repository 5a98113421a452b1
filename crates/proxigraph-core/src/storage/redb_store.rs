//! # redb-backed Snapshot Storage
//!
//! Snapshots and metrics samples kept in a redb embedded database.
//!
//! Tables:
//! - `nodes`: position (u64) -> postcard [`NodeRecord`]
//! - `edges`: position (u64) -> postcard [`Edge`]
//! - `metrics`: sequence (u64) -> postcard [`MetricsSnapshot`]
//!
//! `save` drops and rewrites `nodes` and `edges` inside one write
//! transaction, so readers see either the old snapshot or the new one.
//! `metrics` is append-only.

use crate::storage::SnapshotStore;
use crate::system::{MetricsSink, MetricsSnapshot};
use crate::{Edge, GraphError, GraphSnapshot, NodeRecord};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for nodes: position -> serialized NodeRecord bytes
const NODES: TableDefinition<u64, &[u8]> = TableDefinition::new("nodes");

/// Table for edges: position -> serialized Edge bytes
const EDGES: TableDefinition<u64, &[u8]> = TableDefinition::new("edges");

/// Table for metrics samples: sequence -> serialized MetricsSnapshot bytes
const METRICS: TableDefinition<u64, &[u8]> = TableDefinition::new("metrics");

/// A [`SnapshotStore`] and [`MetricsSink`] on top of redb.
pub struct RedbSnapshotStore {
    db: Database,
}

impl std::fmt::Debug for RedbSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSnapshotStore").finish_non_exhaustive()
    }
}

impl RedbSnapshotStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| GraphError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| GraphError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(NODES)
                .map_err(|e| GraphError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(EDGES)
                .map_err(|e| GraphError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METRICS)
                .map_err(|e| GraphError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| GraphError::IoError(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Every stored metrics sample, oldest first.
    pub fn metrics_history(&self) -> Result<Vec<MetricsSnapshot>, GraphError> {
        self.read_all(METRICS)
    }

    fn read_all<T: DeserializeOwned>(
        &self,
        definition: TableDefinition<u64, &[u8]>,
    ) -> Result<Vec<T>, GraphError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| GraphError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(definition)
            .map_err(|e| GraphError::IoError(e.to_string()))?;

        let mut rows = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| GraphError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| GraphError::IoError(e.to_string()))?;
            let row: T = postcard::from_bytes(value.value())
                .map_err(|e| GraphError::SerializationError(e.to_string()))?;
            rows.push(row);
        }
        Ok(rows)
    }
}

impl SnapshotStore for RedbSnapshotStore {
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), GraphError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| GraphError::IoError(e.to_string()))?;
        write_txn
            .delete_table(NODES)
            .map_err(|e| GraphError::IoError(e.to_string()))?;
        write_txn
            .delete_table(EDGES)
            .map_err(|e| GraphError::IoError(e.to_string()))?;
        {
            let mut nodes = write_txn
                .open_table(NODES)
                .map_err(|e| GraphError::IoError(e.to_string()))?;
            for (position, node) in snapshot.nodes.iter().enumerate() {
                let bytes = postcard::to_stdvec(node)
                    .map_err(|e| GraphError::SerializationError(e.to_string()))?;
                nodes
                    .insert(position as u64, bytes.as_slice())
                    .map_err(|e| GraphError::IoError(e.to_string()))?;
            }

            let mut edges = write_txn
                .open_table(EDGES)
                .map_err(|e| GraphError::IoError(e.to_string()))?;
            for (position, edge) in snapshot.edges.iter().enumerate() {
                let bytes = postcard::to_stdvec(edge)
                    .map_err(|e| GraphError::SerializationError(e.to_string()))?;
                edges
                    .insert(position as u64, bytes.as_slice())
                    .map_err(|e| GraphError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| GraphError::IoError(e.to_string()))?;

        tracing::info!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "snapshot saved to redb"
        );
        Ok(())
    }

    fn load(&self) -> Result<GraphSnapshot, GraphError> {
        let nodes: Vec<NodeRecord> = self.read_all(NODES)?;
        let edges: Vec<Edge> = self.read_all(EDGES)?;
        Ok(GraphSnapshot { nodes, edges })
    }
}

impl MetricsSink for RedbSnapshotStore {
    fn write(&self, snapshot: &MetricsSnapshot) -> Result<(), GraphError> {
        let bytes = postcard::to_stdvec(snapshot)
            .map_err(|e| GraphError::SerializationError(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| GraphError::Sink(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(METRICS)
                .map_err(|e| GraphError::Sink(e.to_string()))?;
            let next = table.len().map_err(|e| GraphError::Sink(e.to_string()))?;
            table
                .insert(next, bytes.as_slice())
                .map_err(|e| GraphError::Sink(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| GraphError::Sink(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
