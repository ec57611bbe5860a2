//! Routing trait and default Dijkstra implementation.
//!
//! # Pluggability
//!
//! The resolver and the service call routing through the [`Router`] trait,
//! so applications can swap in A*, contraction hierarchies, or anything
//! else without touching the façade.  The default [`DijkstraRouter`] is
//! sufficient for city-scale networks.
//!
//! # Cost units
//!
//! Edge cost is the edge length in **metres** (`f64`).  Only open edges are
//! relaxed: status filtering happens at traversal time via
//! [`RoadNetwork::neighbors`], so a blocked view never needs its topology
//! rewritten.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use er_core::{EdgeId, NodeId};

use crate::network::RoadNetwork;
use crate::{SpatialError, SpatialResult};

// ── ShortestPathTree ──────────────────────────────────────────────────────────

/// Output of one single-source search: settled distances and the edge each
/// settled node was reached by.
///
/// Only *settled* nodes are reported.  When the search stopped early (all
/// targets settled), other nodes may carry tentative labels; those are
/// hidden.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    origin:    NodeId,
    dist:      Vec<f64>,
    prev_edge: Vec<EdgeId>,
    settled:   Vec<bool>,
}

impl ShortestPathTree {
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    pub fn is_reached(&self, node: NodeId) -> bool {
        self.settled.get(node.index()).copied().unwrap_or(false)
    }

    /// Shortest distance in metres, `None` if `node` was not settled.
    pub fn distance_to(&self, node: NodeId) -> Option<f64> {
        self.is_reached(node).then(|| self.dist[node.index()])
    }

    /// Edges from the origin to `node` in travel order.  Empty for the
    /// origin itself, `None` if `node` was not settled.
    pub fn path_edges(&self, network: &RoadNetwork, node: NodeId) -> Option<Vec<EdgeId>> {
        if !self.is_reached(node) {
            return None;
        }
        let mut edges = Vec::new();
        let mut cur = node;
        loop {
            let e = self.prev_edge[cur.index()];
            if !e.is_valid() {
                break;
            }
            edges.push(e);
            cur = network.edge_endpoints(e).0;
        }
        edges.reverse();
        Some(edges)
    }
}

// ── Path ──────────────────────────────────────────────────────────────────────

/// Single-pair result of [`Router::route`].
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    /// Edges to traverse in order, from source to destination.
    pub edges: Vec<EdgeId>,
    /// Nodes visited, source and destination included.
    pub nodes: Vec<NodeId>,
    pub length_m: f64,
}

impl Path {
    /// `true` if the source and destination are the same node.
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }
}

// ── Router trait ──────────────────────────────────────────────────────────────

/// Pluggable shortest-path engine.
///
/// Implementations must be `Send + Sync`: the routing service shares one
/// router across concurrent requests.
pub trait Router: Send + Sync {
    /// Single-source search from `origin`.
    ///
    /// `targets` lets the implementation stop once every target is settled;
    /// an empty slice asks for the full reachable tree.
    fn shortest_paths(
        &self,
        network: &RoadNetwork,
        origin:  NodeId,
        targets: &[NodeId],
    ) -> SpatialResult<ShortestPathTree>;

    /// Shortest path from `from` to `to`.
    ///
    /// Returns [`SpatialError::NoRoute`] when `to` is unreachable over open
    /// edges; `from == to` yields a trivial path.
    fn route(&self, network: &RoadNetwork, from: NodeId, to: NodeId) -> SpatialResult<Path> {
        let tree = self.shortest_paths(network, from, &[to])?;
        let (Some(length_m), Some(edges)) = (tree.distance_to(to), tree.path_edges(network, to))
        else {
            return Err(SpatialError::NoRoute { from, to });
        };
        let nodes = std::iter::once(from)
            .chain(edges.iter().map(|&e| network.edge_endpoints(e).1))
            .collect();
        Ok(Path { edges, nodes, length_m })
    }
}

// ── DijkstraRouter ────────────────────────────────────────────────────────────

/// Binary-heap Dijkstra over open edges, weighted by length.
///
/// Terminates when every distinct target is settled, or when the frontier
/// is exhausted (all reachable nodes settled).
#[derive(Debug, Clone, Copy, Default)]
pub struct DijkstraRouter;

impl Router for DijkstraRouter {
    fn shortest_paths(
        &self,
        network: &RoadNetwork,
        origin:  NodeId,
        targets: &[NodeId],
    ) -> SpatialResult<ShortestPathTree> {
        if !network.contains_node(origin) {
            return Err(SpatialError::NodeNotFound(origin));
        }
        if let Some(&bad) = targets.iter().find(|&&t| !network.contains_node(t)) {
            return Err(SpatialError::NodeNotFound(bad));
        }
        Ok(dijkstra(network, origin, targets))
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

fn dijkstra(network: &RoadNetwork, origin: NodeId, targets: &[NodeId]) -> ShortestPathTree {
    let n = network.node_count();
    let mut dist      = vec![f64::INFINITY; n];
    let mut prev_edge = vec![EdgeId::INVALID; n];
    let mut settled   = vec![false; n];

    let mut is_target = vec![false; n];
    let mut remaining = 0usize;
    for &t in targets {
        if !is_target[t.index()] {
            is_target[t.index()] = true;
            remaining += 1;
        }
    }

    dist[origin.index()] = 0.0;

    // Min-heap: (cost, node).  NodeId as secondary key keeps pops deterministic.
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((OrderedFloat(0.0), origin)));

    while let Some(Reverse((OrderedFloat(cost), node))) = heap.pop() {
        // Stale heap entry.
        if settled[node.index()] {
            continue;
        }
        settled[node.index()] = true;

        if is_target[node.index()] {
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }

        for (edge, next, length_m) in network.neighbors(node) {
            if settled[next.index()] {
                continue;
            }
            let new_cost = cost + length_m;
            if new_cost < dist[next.index()] {
                dist[next.index()] = new_cost;
                prev_edge[next.index()] = edge;
                heap.push(Reverse((OrderedFloat(new_cost), next)));
            }
        }
    }

    ShortestPathTree { origin, dist, prev_edge, settled }
}
