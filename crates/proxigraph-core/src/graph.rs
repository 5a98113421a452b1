//! # Bounded Graph
//!
//! The capacity-bounded node/edge store of Proxigraph.
//!
//! Nodes and edges are kept as ordered sequences: node order is insertion
//! order, and every query that returns nodes preserves it. Edges are never
//! stated by the caller; they are derived from node proximity:
//!
//! - `derive_edges_full` links every ordered pair closer than
//!   [`PROXIMITY_THRESHOLD`]
//! - `derive_edges_incremental` links one fresh node to everything closer
//!   than [`INCREMENTAL_THRESHOLD`]
//!
//! Both paths de-duplicate on the source side only: a link is skipped when
//! the target already appears in the source's `connections`.
//!
//! ## Capacity
//!
//! `len(nodes) <= capacity` holds after every public mutation. Inserting into
//! a full graph first evicts the node with the oldest `last_used` stamp
//! together with every edge that touches it.

use crate::geometry::distance;
use crate::primitives::{
    CANVAS_HEIGHT, CANVAS_WIDTH, CLUSTER_BUCKETS, DEFAULT_CAPACITY, FIRST_NODE_NUMBER,
    INCREMENTAL_THRESHOLD, PROXIMITY_THRESHOLD,
};
use crate::{Edge, GraphError, GraphSnapshot, Node, NodeId, NodeRecord};
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// =============================================================================
// METRICS
// =============================================================================

/// Connection statistics of a graph at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Largest `connections` length over all nodes, 0 on an empty graph.
    pub max_connections: usize,
    /// Sum of `connections` lengths divided by `max(total_nodes, 1)`.
    pub avg_connections: f64,
}

impl GraphMetrics {
    /// Metrics of an empty graph.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_nodes: 0,
            total_edges: 0,
            max_connections: 0,
            avg_connections: 0.0,
        }
    }
}

// =============================================================================
// GRAPH
// =============================================================================

/// The capacity-bounded proximity graph.
///
/// Single writer: every mutating method takes `&mut self`. Wrap the graph
/// (usually through a [`Session`](crate::Session)) in one lock if several
/// producers feed it.
#[derive(Debug, Clone)]
pub struct BoundedGraph {
    /// Node storage, in insertion order.
    nodes: Vec<Node>,

    /// Edge storage, in creation order.
    edges: Vec<Edge>,

    /// Number the next inserted node receives.
    next_id: u64,

    /// Maximum number of nodes held at once.
    capacity: usize,

    /// Last `last_used` stamp handed out. Stamps are strictly increasing so
    /// eviction order never depends on clock resolution.
    last_stamp: DateTime<Utc>,

    /// Source of generated coordinates.
    rng: StdRng,
}

impl Default for BoundedGraph {
    fn default() -> Self {
        Self::with_rng(DEFAULT_CAPACITY, StdRng::from_os_rng())
    }
}

impl BoundedGraph {
    /// Create an empty graph holding at most `capacity` nodes.
    pub fn new(capacity: usize) -> Result<Self, GraphError> {
        if capacity == 0 {
            return Err(GraphError::InvalidCapacity(capacity));
        }
        Ok(Self::with_rng(capacity, StdRng::from_os_rng()))
    }

    /// Create an empty graph whose generated coordinates come from `seed`.
    ///
    /// Two graphs built from the same seed and fed the same operations place
    /// their nodes identically.
    pub fn with_seed(capacity: usize, seed: u64) -> Result<Self, GraphError> {
        if capacity == 0 {
            return Err(GraphError::InvalidCapacity(capacity));
        }
        Ok(Self::with_rng(capacity, StdRng::seed_from_u64(seed)))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            next_id: FIRST_NODE_NUMBER,
            capacity,
            last_stamp: DateTime::<Utc>::MIN_UTC,
            rng,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// All nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges in creation order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number the next inserted node will receive.
    #[must_use]
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    fn position(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.last_stamp = if now > self.last_stamp {
            now
        } else {
            self.last_stamp + TimeDelta::nanoseconds(1)
        };
        self.last_stamp
    }

    // =========================================================================
    // INSERTION & EVICTION
    // =========================================================================

    /// Insert a node, evicting one first if the graph is full.
    ///
    /// Coordinates default to a uniform-random point on the
    /// `[0, 800) x [0, 600)` canvas. Caller-supplied coordinates are taken
    /// as-is. Returns a copy of the created node.
    pub fn insert_node(&mut self, x: Option<f64>, y: Option<f64>) -> Result<Node, GraphError> {
        if self.nodes.len() >= self.capacity {
            self.evict_least_used();
        }
        if self.nodes.len() >= self.capacity {
            return Err(GraphError::CapacityInvariantViolation {
                capacity: self.capacity,
                len: self.nodes.len().saturating_add(1),
            });
        }

        let x = x.unwrap_or_else(|| self.rng.random_range(0.0..CANVAS_WIDTH));
        let y = y.unwrap_or_else(|| self.rng.random_range(0.0..CANVAS_HEIGHT));

        let number = self.next_id;
        self.next_id = self.next_id.saturating_add(1);

        let stamp = self.stamp();
        let node = Node::new(number, x, y, stamp);
        self.nodes.push(node.clone());

        Ok(node)
    }

    /// Evict the least recently used node and every edge touching it.
    ///
    /// Ties on `last_used` go to the earliest inserted node. Connections of
    /// surviving nodes are not rewritten. Returns the evicted node, or
    /// `None` on an empty graph.
    pub fn evict_least_used(&mut self) -> Option<Node> {
        let index = self
            .nodes
            .iter()
            .enumerate()
            .min_by_key(|(_, n)| n.last_used)
            .map(|(i, _)| i)?;

        let evicted = self.nodes.remove(index);
        self.edges.retain(|e| !e.touches(&evicted.id));

        tracing::debug!(node = %evicted.id, "evicted least recently used node");
        Some(evicted)
    }

    /// Mark a node as used now, moving it to the back of the eviction order.
    ///
    /// No ingestion path calls this: eviction is oldest-inserted-first unless
    /// a caller touches nodes explicitly.
    pub fn touch(&mut self, id: &NodeId) -> Result<(), GraphError> {
        let index = self
            .position(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        let stamp = self.stamp();
        self.nodes[index].last_used = stamp;
        Ok(())
    }

    // =========================================================================
    // EDGE DERIVATION
    // =========================================================================

    /// Link every ordered pair of distinct nodes closer than
    /// [`PROXIMITY_THRESHOLD`].
    ///
    /// Running it again on an unchanged node set adds nothing. Returns the
    /// number of edges added.
    pub fn derive_edges_full(&mut self) -> usize {
        let mut added = 0;
        for source in 0..self.nodes.len() {
            for target in 0..self.nodes.len() {
                if source == target {
                    continue;
                }
                if self.link_if_close(source, target, PROXIMITY_THRESHOLD) {
                    added += 1;
                }
            }
        }
        added
    }

    /// Link `id` to every other node closer than [`INCREMENTAL_THRESHOLD`],
    /// with `id` as the source of every new edge.
    ///
    /// Returns the number of edges added.
    pub fn derive_edges_incremental(&mut self, id: &NodeId) -> Result<usize, GraphError> {
        let source = self
            .position(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        let mut added = 0;
        for target in 0..self.nodes.len() {
            if target == source {
                continue;
            }
            if self.link_if_close(source, target, INCREMENTAL_THRESHOLD) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Append-and-record rule shared by both derivation paths.
    fn link_if_close(&mut self, source: usize, target: usize, threshold: f64) -> bool {
        let (target_id, d) = {
            let s = &self.nodes[source];
            let t = &self.nodes[target];
            (t.id.clone(), distance(s.x, s.y, t.x, t.y))
        };

        // NaN compares false, so test for closeness rather than distance.
        let close = d < threshold;
        if !close || self.nodes[source].is_connected_to(&target_id) {
            return false;
        }

        let source_node = &mut self.nodes[source];
        source_node.connections.push(target_id.clone());
        self.edges
            .push(Edge::new(source_node.id.clone(), target_id, d));
        true
    }

    /// Add an edge between two existing nodes if they are closer than
    /// [`PROXIMITY_THRESHOLD`].
    ///
    /// Unlike derivation this neither consults nor updates `connections`, so
    /// repeating the call adds the same edge again. Returns the added edge,
    /// or `None` if the nodes are too far apart.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId) -> Result<Option<Edge>, GraphError> {
        let (Some(s), Some(t)) = (self.node(source), self.node(target)) else {
            return Err(GraphError::MissingEndpoint {
                from: source.clone(),
                to: target.clone(),
            });
        };

        let d = distance(s.x, s.y, t.x, t.y);
        let close = d < PROXIMITY_THRESHOLD;
        if !close {
            return Ok(None);
        }

        let edge = Edge::new(s.id.clone(), t.id.clone(), d);
        self.edges.push(edge.clone());
        Ok(Some(edge))
    }

    // =========================================================================
    // ANALYSIS
    // =========================================================================

    /// Connection statistics.
    #[must_use]
    pub fn metrics(&self) -> GraphMetrics {
        let total_nodes = self.nodes.len();
        let max_connections = self.nodes.iter().map(Node::degree).max().unwrap_or(0);
        let sum: usize = self.nodes.iter().map(Node::degree).sum();

        GraphMetrics {
            total_nodes,
            total_edges: self.edges.len(),
            max_connections,
            avg_connections: sum as f64 / total_nodes.max(1) as f64,
        }
    }

    /// Nodes with strictly more than `threshold` connections, in node order.
    #[must_use]
    pub fn anomalies(&self, threshold: usize) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|n| n.degree() > threshold)
            .collect()
    }

    /// Group nodes by `number mod 5`.
    ///
    /// Buckets appear in the order their first member appears; members keep
    /// node order.
    #[must_use]
    pub fn cluster_nodes(&self) -> Vec<(u64, Vec<&Node>)> {
        let mut clusters: Vec<(u64, Vec<&Node>)> = Vec::new();
        for node in &self.nodes {
            let bucket = node.number % CLUSTER_BUCKETS;
            match clusters.iter_mut().find(|(b, _)| *b == bucket) {
                Some((_, members)) => members.push(node),
                None => clusters.push((bucket, vec![node])),
            }
        }
        clusters
    }

    // =========================================================================
    // RESET & RESTORE
    // =========================================================================

    /// Drop every node and edge and restart numbering at `N2`.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.next_id = FIRST_NODE_NUMBER;
    }

    /// Owned copy of the persisted part of the graph.
    #[must_use]
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.iter().map(NodeRecord::from).collect(),
            edges: self.edges.clone(),
        }
    }

    /// Replace the whole graph with `snapshot`.
    ///
    /// Nodes come back with empty `connections` and fresh `last_used` stamps
    /// in snapshot order; edges are taken verbatim without re-checking the
    /// proximity threshold. Numbering resumes after the highest restored
    /// number. If the snapshot holds more nodes than the capacity, the oldest
    /// are evicted until it fits.
    pub fn restore(&mut self, snapshot: GraphSnapshot) {
        self.clear();

        for record in snapshot.nodes {
            let stamp = self.stamp();
            if record.number >= self.next_id {
                self.next_id = record.number.saturating_add(1);
            }
            self.nodes.push(Node {
                id: record.id,
                number: record.number,
                x: record.x,
                y: record.y,
                connections: Vec::new(),
                last_used: stamp,
            });
        }
        self.edges = snapshot.edges;

        if self.nodes.len() > self.capacity {
            tracing::warn!(
                restored = self.nodes.len(),
                capacity = self.capacity,
                "snapshot exceeds capacity, evicting oldest nodes"
            );
            while self.nodes.len() > self.capacity {
                self.evict_least_used();
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
