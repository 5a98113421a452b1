//! # Validation Tier Tests (T0-T4)
//!
//! End-to-end scenarios through the public API. If ANY tier fails, the
//! engine is INVALID.
//!
//! ## Tiers
//! - T0: Record Decoding
//! - T1: Bounded Capacity & Eviction
//! - T2: Proximity Edges
//! - T3: Batched Ingestion
//! - T4: Snapshot Persistence

use proxigraph_core::{
    BoundedGraph, DecodeError, Event, EventDecoder, FileSnapshotStore, GraphError, NodeId,
    RedbSnapshotStore, Session, SessionConfig, SnapshotStore,
};
use serde_json::json;

fn graph(capacity: usize) -> BoundedGraph {
    BoundedGraph::with_seed(capacity, 99).expect("graph")
}

// =============================================================================
// TIER T0: RECORD DECODING
// =============================================================================

mod t0_record_decoding {
    use super::*;

    /// T0.1: Both event kinds decode.
    #[test]
    fn known_kinds_decode() {
        assert!(matches!(
            EventDecoder::decode(&json!({"event": "add_node", "id": "N1"})),
            Ok(Event::CreateNode { .. })
        ));
        assert!(matches!(
            EventDecoder::decode(&json!({"event": "transition", "source": "N1", "target": "N2"})),
            Ok(Event::Connect { .. })
        ));
    }

    /// T0.2: Unknown kinds are rejected with the kind named.
    #[test]
    fn unknown_kind_rejected() {
        let err = EventDecoder::decode_line(br#"{"event":"teleport"}"#).expect_err("reject");
        assert_eq!(err, DecodeError::UnknownKind("teleport".to_string()));
    }
}

// =============================================================================
// TIER T1: BOUNDED CAPACITY & EVICTION
// =============================================================================

mod t1_capacity {
    use super::*;

    /// T1.1: Capacity 3, insert A, B, C, D: A is evicted.
    #[test]
    fn fourth_insert_evicts_first() {
        let mut g = graph(3);
        let ids: Vec<NodeId> = (0..4)
            .map(|i| {
                g.insert_node(Some(i as f64 * 200.0), Some(0.0))
                    .expect("insert")
                    .id
            })
            .collect();

        let remaining: Vec<_> = g.nodes().iter().map(|n| n.id.clone()).collect();
        assert_eq!(remaining, ids[1..].to_vec());
    }

    /// T1.2: Capacity C, insert C+1: the C newest remain and the evicted
    /// node's edges are gone.
    #[test]
    fn eviction_takes_edges_along() {
        let mut g = graph(4);
        for i in 0..4 {
            let node = g.insert_node(Some(i as f64 * 30.0), Some(0.0)).expect("insert");
            g.derive_edges_incremental(&node.id).expect("derive");
        }
        let first = g.nodes()[0].id.clone();
        assert!(g.edges().iter().any(|e| e.touches(&first)));

        g.insert_node(Some(500.0), Some(500.0)).expect("insert");
        assert_eq!(g.node_count(), 4);
        assert!(!g.contains_node(&first));
        assert!(g.edges().iter().all(|e| !e.touches(&first)));
    }
}

// =============================================================================
// TIER T2: PROXIMITY EDGES
// =============================================================================

mod t2_proximity {
    use super::*;

    /// T2.1: 149.9 apart links, 150 apart does not.
    #[test]
    fn threshold_is_strict() {
        let mut close = graph(2);
        close.insert_node(Some(0.0), Some(0.0)).expect("insert");
        close.insert_node(Some(149.9), Some(0.0)).expect("insert");
        assert_eq!(close.derive_edges_full(), 2);

        let mut exact = graph(2);
        exact.insert_node(Some(0.0), Some(0.0)).expect("insert");
        exact.insert_node(Some(150.0), Some(0.0)).expect("insert");
        assert_eq!(exact.derive_edges_full(), 0);
    }

    /// T2.2: Repeated full derivation adds nothing.
    #[test]
    fn full_derivation_settles() {
        let mut g = graph(6);
        for i in 0..6 {
            g.insert_node(Some(i as f64 * 40.0), Some(10.0)).expect("insert");
        }
        g.derive_edges_full();
        let settled = g.edge_count();
        g.derive_edges_full();
        assert_eq!(g.edge_count(), settled);
    }
}

// =============================================================================
// TIER T3: BATCHED INGESTION
// =============================================================================

mod t3_ingestion {
    use super::*;

    fn session(batch_size: usize) -> Session {
        Session::with_config(SessionConfig {
            capacity: 10,
            batch_size,
            history_limit: Some(10),
            seed: Some(5),
        })
        .expect("session")
    }

    /// T3.1: batch_size 2 with [add_node, malformed, transition]: the first
    /// flush applies record 1, reports record 2 and clears the buffer; record
    /// 3 waits for the next trigger.
    #[test]
    fn failure_isolated_to_its_record() {
        let mut s = session(2);

        assert!(s.submit(json!({"event": "add_node"})).expect("submit").is_none());
        let report = s
            .submit_line(b"{\"event\": ")
            .expect("submit")
            .expect("flushed");

        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert!(matches!(
            report.failures[0].error,
            GraphError::Decode(DecodeError::Malformed(_))
        ));
        assert_eq!(s.pending(), 0);

        let node = s.graph().nodes()[0].id.clone();
        let third = s
            .submit(json!({"event": "transition", "source": node.as_str(), "target": node.as_str()}))
            .expect("submit");
        assert!(third.is_none());
        assert_eq!(s.pending(), 1);

        let report = s.flush().expect("flush");
        assert_eq!(report.applied, 1);
    }

    /// T3.2: Connect with an absent endpoint changes nothing.
    #[test]
    fn missing_endpoint_leaves_graph_untouched() {
        let mut s = session(1);
        s.submit(json!({"event": "add_node"})).expect("submit");
        let before = s.snapshot();

        let report = s
            .submit(json!({"event": "transition", "source": "X", "target": "Y"}))
            .expect("submit")
            .expect("flushed");

        assert!(matches!(
            report.failures[0].error,
            GraphError::MissingEndpoint { .. }
        ));
        assert_eq!(s.snapshot(), before);
    }
}

// =============================================================================
// TIER T4: SNAPSHOT PERSISTENCE
// =============================================================================

mod t4_persistence {
    use super::*;
    use tempfile::tempdir;

    fn populated() -> BoundedGraph {
        let mut g = graph(8);
        for _ in 0..8 {
            let node = g.insert_node(None, None).expect("insert");
            g.derive_edges_incremental(&node.id).expect("derive");
        }
        g.derive_edges_full();
        g
    }

    fn roundtrip(store: &dyn SnapshotStore) {
        let mut g = populated();
        let saved = g.snapshot();
        store.save(&saved).expect("save");

        g.clear();
        g.restore(store.load().expect("load"));

        assert_eq!(g.snapshot(), saved);
        assert!(g.nodes().iter().all(|n| n.connections.is_empty()));
    }

    /// T4.1: save, clear, restore through a file.
    #[test]
    fn file_roundtrip() {
        let temp = tempdir().expect("temp dir");
        roundtrip(&FileSnapshotStore::new(temp.path().join("graph.pxg")));
    }

    /// T4.2: save, clear, restore through redb.
    #[test]
    fn redb_roundtrip() {
        let temp = tempdir().expect("temp dir");
        let store = RedbSnapshotStore::open(temp.path().join("graph.redb")).expect("open");
        roundtrip(&store);
    }
}
