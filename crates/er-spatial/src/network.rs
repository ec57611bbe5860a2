//! Road network representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the id range:
//!
//! ```text
//! node_out_start[n] .. node_out_start[n+1]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_length_m`,
//! `edge_geometry`, `edge_status`) are sorted by source node and indexed by
//! `EdgeId`.  Iterating a node's outgoing edges is a contiguous scan.
//!
//! # Edge status
//!
//! Topology never changes after [`RoadNetworkBuilder::build`].  Blocking and
//! removal flip a per-edge [`EdgeStatus`] in O(1); [`RoadNetwork::neighbors`]
//! only yields `Open` edges, so a blocked or removed edge is invisible to
//! routing without touching the CSR arrays.
//!
//! # Spatial indexes
//!
//! - Nodes: R-tree over positions projected with a [`LocalProjection`]
//!   centred on the network, so nearest-node distances are in metres.
//! - Edges: R-tree over polyline bounding boxes in lon/lat, queried by the
//!   flood pass with each polygon's bounding box.

use geo::{BoundingRect, LineString, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use er_core::{EdgeId, GeoPoint, LocalProjection, NodeId};

use crate::geometry::{coord, envelope, line_length_m, line_string};
use crate::{SpatialError, SpatialResult};

// ── Edge status ───────────────────────────────────────────────────────────────

/// Routability of a single directed edge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeStatus {
    Open,
    /// Excluded by a flood pass; [`RoadNetwork::reset_blocking`] reopens it.
    Blocked,
    /// Permanently withdrawn via [`RoadNetwork::remove_edge`].
    Removed,
}

// ── R-tree entries ────────────────────────────────────────────────────────────

/// Node entry in the snapping index: projected `[east_m, north_m]`.
#[derive(Clone, Debug)]
struct NodeEntry {
    point: [f64; 2],
    id: NodeId,
}

impl RTreeObject for NodeEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for NodeEntry {
    /// Squared planar distance in metres².
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

type EdgeEnvelope = GeomWithData<Rectangle<[f64; 2]>, EdgeId>;

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// Directed road graph in CSR format, per-edge status, and spatial indexes.
///
/// Do not construct directly; use [`RoadNetworkBuilder`].  `Clone` yields
/// an independent copy with identical node and edge ids, which is how a new
/// flood version gets its own blocked view of the same roads.
#[derive(Clone)]
pub struct RoadNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    node_pos: Vec<GeoPoint>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// Length = `node_count + 1`.
    node_out_start: Vec<u32>,

    // ── Edge data (indexed by EdgeId = position in sorted order) ──────────
    edge_from: Vec<NodeId>,
    edge_to: Vec<NodeId>,
    edge_length_m: Vec<f64>,
    edge_geometry: Vec<LineString<f64>>,
    edge_status: Vec<EdgeStatus>,

    // ── Spatial indexes ───────────────────────────────────────────────────
    projection: LocalProjection,
    node_idx: RTree<NodeEntry>,
    edge_idx: RTree<EdgeEnvelope>,
}

impl std::fmt::Debug for RoadNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoadNetwork")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .field("open_edges", &self.open_edge_count())
            .finish_non_exhaustive()
    }
}

impl RoadNetwork {
    /// Construct a network with no nodes or edges.  Every nearest-node query
    /// against it fails with [`SpatialError::NoNearbyNode`].
    pub fn empty() -> Self {
        RoadNetworkBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    #[inline]
    pub fn contains_node(&self, node: NodeId) -> bool {
        node.index() < self.node_pos.len()
    }

    #[inline]
    pub fn contains_edge(&self, edge: EdgeId) -> bool {
        edge.index() < self.edge_to.len()
    }

    // ── Node / edge attributes ────────────────────────────────────────────

    /// Position of `node`.  Panics if `node` is not in the network.
    #[inline]
    pub fn node_pos(&self, node: NodeId) -> GeoPoint {
        self.node_pos[node.index()]
    }

    /// `(source, target)` of `edge`.  Panics if `edge` is not in the network.
    #[inline]
    pub fn edge_endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.edge_from[edge.index()], self.edge_to[edge.index()])
    }

    #[inline]
    pub fn edge_length_m(&self, edge: EdgeId) -> f64 {
        self.edge_length_m[edge.index()]
    }

    /// Polyline of `edge` in lon/lat order.
    #[inline]
    pub fn edge_geometry(&self, edge: EdgeId) -> &LineString<f64> {
        &self.edge_geometry[edge.index()]
    }

    pub fn edge_status(&self, edge: EdgeId) -> SpatialResult<EdgeStatus> {
        self.edge_status
            .get(edge.index())
            .copied()
            .ok_or(SpatialError::EdgeNotFound(edge))
    }

    #[inline]
    pub fn is_open(&self, edge: EdgeId) -> bool {
        self.edge_status.get(edge.index()) == Some(&EdgeStatus::Open)
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Every outgoing edge of `node`, whatever its status.
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()];
        let end   = self.node_out_start[node.index() + 1];
        (start..end).map(EdgeId)
    }

    /// Number of outgoing edges of `node` that are currently open.
    pub fn open_out_degree(&self, node: NodeId) -> usize {
        self.out_edges(node).filter(|&e| self.is_open(e)).count()
    }

    /// Open outgoing edges of `node` as `(edge, target, length_m)`.
    ///
    /// This is the only adjacency view the router uses, so blocked and
    /// removed edges never take part in traversal.
    #[inline]
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, f64)> + '_ {
        self.out_edges(node)
            .filter(|&e| self.edge_status[e.index()] == EdgeStatus::Open)
            .map(|e| (e, self.edge_to[e.index()], self.edge_length_m[e.index()]))
    }

    /// All edges from `from` to `to` (parallel segments included), any status.
    pub fn edges_between(&self, from: NodeId, to: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.out_edges(from)
            .filter(move |&e| self.edge_to[e.index()] == to)
    }

    // ── Status mutation ───────────────────────────────────────────────────

    /// Mark `edge` blocked.  Returns `true` if it was open before.
    ///
    /// Removed edges stay removed.
    pub fn block_edge(&mut self, edge: EdgeId) -> SpatialResult<bool> {
        let status = self
            .edge_status
            .get_mut(edge.index())
            .ok_or(SpatialError::EdgeNotFound(edge))?;
        if *status == EdgeStatus::Open {
            *status = EdgeStatus::Blocked;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Withdraw `edge` from routing permanently.  O(1).
    ///
    /// The CSR slot stays in place; [`neighbors`](Self::neighbors) filters it
    /// out, so no adjacency view can hand the edge back.
    pub fn remove_edge(&mut self, edge: EdgeId) -> SpatialResult<()> {
        let status = self
            .edge_status
            .get_mut(edge.index())
            .ok_or(SpatialError::EdgeNotFound(edge))?;
        *status = EdgeStatus::Removed;
        Ok(())
    }

    /// Reopen every blocked edge (the unblocked baseline).  Removed edges are
    /// untouched.  Returns the number of edges reopened.
    pub fn reset_blocking(&mut self) -> usize {
        let mut reopened = 0;
        for status in &mut self.edge_status {
            if *status == EdgeStatus::Blocked {
                *status = EdgeStatus::Open;
                reopened += 1;
            }
        }
        reopened
    }

    /// Ids of all currently blocked edges, ascending.
    pub fn blocked_edges(&self) -> Vec<EdgeId> {
        self.edges_with_status(EdgeStatus::Blocked).collect()
    }

    pub fn open_edge_count(&self) -> usize {
        self.edges_with_status(EdgeStatus::Open).count()
    }

    fn edges_with_status(&self, wanted: EdgeStatus) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_status
            .iter()
            .enumerate()
            .filter(move |&(_, &s)| s == wanted)
            .map(|(i, _)| EdgeId(i as u32))
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest road node to `pos`.  O(log N) via the R-tree.
    ///
    /// Fails with [`SpatialError::NoNearbyNode`] on an empty network or when
    /// `pos` is not a valid coordinate (NaN, infinite, out of range).
    pub fn nearest_node(&self, pos: GeoPoint) -> SpatialResult<NodeId> {
        if !pos.is_valid() {
            return Err(SpatialError::NoNearbyNode { pos });
        }
        self.node_idx
            .nearest_neighbor(&self.projection.project(pos))
            .map(|e| e.id)
            .ok_or(SpatialError::NoNearbyNode { pos })
    }

    /// Like [`nearest_node`](Self::nearest_node), but also fails when the
    /// closest node is more than `max_m` metres (great-circle) from `pos`.
    pub fn nearest_node_within(&self, pos: GeoPoint, max_m: f64) -> SpatialResult<NodeId> {
        let node = self.nearest_node(pos)?;
        if pos.distance_m(self.node_pos(node)) <= max_m {
            Ok(node)
        } else {
            Err(SpatialError::NoNearbyNode { pos })
        }
    }

    /// Edges whose bounding box meets `rect` (lon/lat), any status.
    pub(crate) fn edges_in_rect(&self, rect: Rect<f64>) -> impl Iterator<Item = EdgeId> + '_ {
        self.edge_idx
            .locate_in_envelope_intersecting(&envelope(rect))
            .map(|entry| entry.data)
    }

    /// Projection used by the node index.
    pub fn projection(&self) -> LocalProjection {
        self.projection
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// Nodes and directed edges may be added in any order.  Edges are validated
/// on insertion: both endpoints must exist and the length must be finite and
/// non-negative.  `build()` sorts edges by source node (stable, so parallel
/// edges keep insertion order), constructs the CSR arrays, and bulk-loads
/// both R-trees.
///
/// # Example
///
/// ```
/// use er_core::GeoPoint;
/// use er_spatial::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new();
/// let a = b.add_node(GeoPoint::new(13.060, 80.249));
/// let c = b.add_node(GeoPoint::new(13.067, 80.237));
/// b.add_road(a, c, 1_450.0).unwrap();
/// let net = b.build();
/// assert_eq!(net.node_count(), 2);
/// assert_eq!(net.edge_count(), 2); // bidirectional
/// ```
pub struct RoadNetworkBuilder {
    nodes:     Vec<GeoPoint>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    from:     NodeId,
    to:       NodeId,
    length_m: f64,
    geometry: LineString<f64>,
}

impl RoadNetworkBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new(), raw_edges: Vec::new() }
    }

    /// Pre-allocate for the expected number of nodes and edges.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            nodes:     Vec::with_capacity(nodes),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a road node and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** straight edge from `from` to `to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, length_m: f64) -> SpatialResult<()> {
        self.add_edge_with_geometry(from, to, &[], Some(length_m))
    }

    /// Add a **directed** edge with an explicit polyline.
    ///
    /// - `geometry`: road shape from source to target; fewer than two points
    ///   falls back to the straight segment between the endpoints.
    /// - `length_m`: `None` derives the length from the geometry.
    pub fn add_edge_with_geometry(
        &mut self,
        from:     NodeId,
        to:       NodeId,
        geometry: &[GeoPoint],
        length_m: Option<f64>,
    ) -> SpatialResult<()> {
        let geometry = self.resolve_geometry(from, to, geometry)?;
        let length_m = length_m.unwrap_or_else(|| line_length_m(&geometry));
        if !(length_m.is_finite() && length_m >= 0.0) {
            return Err(SpatialError::InvalidLength { from, to, length_m });
        }
        self.raw_edges.push(RawEdge { from, to, length_m, geometry });
        Ok(())
    }

    /// Convenience: add edges in **both directions** for a two-way road.
    pub fn add_road(&mut self, a: NodeId, b: NodeId, length_m: f64) -> SpatialResult<()> {
        self.add_road_with_geometry(a, b, &[], Some(length_m))
    }

    /// Two-way road with a shape; the reverse edge gets the reversed polyline.
    pub fn add_road_with_geometry(
        &mut self,
        a:        NodeId,
        b:        NodeId,
        geometry: &[GeoPoint],
        length_m: Option<f64>,
    ) -> SpatialResult<()> {
        self.add_edge_with_geometry(a, b, geometry, length_m)?;
        let reversed: Vec<GeoPoint> = geometry.iter().rev().copied().collect();
        self.add_edge_with_geometry(b, a, &reversed, length_m)
    }

    /// Position of a node added earlier.  Panics if `id` was never added.
    pub fn node_pos(&self, id: NodeId) -> GeoPoint {
        self.nodes[id.index()]
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    fn resolve_geometry(
        &self,
        from:     NodeId,
        to:       NodeId,
        geometry: &[GeoPoint],
    ) -> SpatialResult<LineString<f64>> {
        let from_pos = *self.nodes.get(from.index()).ok_or(SpatialError::NodeNotFound(from))?;
        let to_pos = *self.nodes.get(to.index()).ok_or(SpatialError::NodeNotFound(to))?;
        if geometry.len() >= 2 {
            Ok(line_string(geometry))
        } else {
            Ok(LineString::new(vec![coord(from_pos), coord(to_pos)]))
        }
    }

    /// Consume the builder and produce a [`RoadNetwork`].
    ///
    /// Time complexity: O(E log E) for the edge sort + O(N log N + E log E)
    /// for the R-tree bulk loads.
    pub fn build(self) -> RoadNetwork {
        self.build_indexed().0
    }

    /// Like [`build`](Self::build), also returning the final `EdgeId` of
    /// every edge in insertion order (`ids[k]` is the k-th edge added).
    pub fn build_indexed(self) -> (RoadNetwork, Vec<EdgeId>) {
        let node_count = self.nodes.len();
        let edge_count = self.raw_edges.len();

        let mut raw: Vec<(usize, RawEdge)> = self.raw_edges.into_iter().enumerate().collect();
        raw.sort_by_key(|(_, e)| e.from.0);

        let mut ids = vec![EdgeId::INVALID; edge_count];
        for (i, (inserted, _)) in raw.iter().enumerate() {
            ids[*inserted] = EdgeId(i as u32);
        }

        // CSR row pointer.
        let mut node_out_start = vec![0u32; node_count + 1];
        for (_, e) in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }
        debug_assert_eq!(node_out_start[node_count] as usize, edge_count);

        let mut edge_from     = Vec::with_capacity(edge_count);
        let mut edge_to       = Vec::with_capacity(edge_count);
        let mut edge_length_m = Vec::with_capacity(edge_count);
        let mut edge_geometry = Vec::with_capacity(edge_count);
        let mut edge_entries  = Vec::with_capacity(edge_count);

        for (i, (_, e)) in raw.into_iter().enumerate() {
            if let Some(rect) = e.geometry.bounding_rect() {
                edge_entries.push(GeomWithData::new(
                    Rectangle::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                    EdgeId(i as u32),
                ));
            }
            edge_from.push(e.from);
            edge_to.push(e.to);
            edge_length_m.push(e.length_m);
            edge_geometry.push(e.geometry);
        }

        let projection = LocalProjection::centered_on(self.nodes.iter().copied());
        let node_entries: Vec<NodeEntry> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &pos)| NodeEntry {
                point: projection.project(pos),
                id: NodeId(i as u32),
            })
            .collect();

        let network = RoadNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_geometry,
            edge_status: vec![EdgeStatus::Open; edge_count],
            projection,
            node_idx: RTree::bulk_load(node_entries),
            edge_idx: RTree::bulk_load(edge_entries),
        };
        (network, ids)
    }
}

impl Default for RoadNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}
