//! # File Snapshot Storage
//!
//! One snapshot per file, in the [`formats`](crate::formats) encoding.
//! Every save writes its own uniquely named temporary file next to the
//! target and renames it into place, so a crash mid-save leaves the previous
//! snapshot intact and concurrent saves never share a temporary file.

use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::storage::SnapshotStore;
use crate::{GraphError, GraphSnapshot};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A [`SnapshotStore`] backed by a single file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the snapshot file (and its temporary files) live in.
    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &GraphSnapshot) -> Result<(), GraphError> {
        let bytes = snapshot_to_bytes(snapshot)?;

        let dir = self.dir();
        std::fs::create_dir_all(dir).map_err(|e| GraphError::IoError(e.to_string()))?;

        let mut temp =
            NamedTempFile::new_in(dir).map_err(|e| GraphError::IoError(e.to_string()))?;
        temp.write_all(&bytes)
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| GraphError::IoError(e.to_string()))?;
        temp.persist(&self.path)
            .map_err(|e| GraphError::IoError(e.error.to_string()))?;

        tracing::info!(
            path = %self.path.display(),
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            bytes = bytes.len(),
            "snapshot saved"
        );
        Ok(())
    }

    fn load(&self) -> Result<GraphSnapshot, GraphError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => snapshot_from_bytes(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(GraphSnapshot::default()),
            Err(e) => Err(GraphError::IoError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BoundedGraph;
    use std::sync::Arc;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn missing_file_loads_empty() {
        let temp = tempdir().expect("temp dir");
        let store = FileSnapshotStore::new(temp.path().join("absent.pxg"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn roundtrip_through_file() {
        let temp = tempdir().expect("temp dir");
        let store = FileSnapshotStore::new(temp.path().join("nested/graph.pxg"));

        let mut graph = BoundedGraph::with_seed(4, 9).expect("graph");
        for _ in 0..4 {
            graph.insert_node(None, None).expect("insert");
        }
        graph.derive_edges_full();
        let snapshot = graph.snapshot();

        store.save(&snapshot).expect("save");
        assert_eq!(store.load().expect("load"), snapshot);

        let leftovers = std::fs::read_dir(temp.path().join("nested"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn concurrent_saves_all_succeed() {
        let temp = tempdir().expect("temp dir");
        let store = Arc::new(FileSnapshotStore::new(temp.path().join("graph.pxg")));

        let mut large = BoundedGraph::with_seed(400, 3).expect("graph");
        for _ in 0..400 {
            large.insert_node(None, None).expect("insert");
        }
        let large = large.snapshot();
        let mut small = BoundedGraph::with_seed(1, 3).expect("graph");
        small.insert_node(None, None).expect("insert");
        let small = small.snapshot();

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = Arc::clone(&store);
                let (large, small) = (large.clone(), small.clone());
                thread::spawn(move || {
                    (0..50)
                        .map(|round| {
                            let snapshot = if (worker + round) % 2 == 0 { &large } else { &small };
                            store.save(snapshot)
                        })
                        .filter(Result::is_err)
                        .count()
                })
            })
            .collect();

        let failures: usize = handles
            .into_iter()
            .map(|h| h.join().expect("worker"))
            .sum();
        assert_eq!(failures, 0);

        let loaded = store.load().expect("load");
        assert!(loaded == large || loaded == small);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("graph.pxg");
        std::fs::write(&path, b"not a snapshot").expect("write");

        let store = FileSnapshotStore::new(path);
        assert!(matches!(
            store.load(),
            Err(GraphError::SerializationError(_))
        ));
    }
}
