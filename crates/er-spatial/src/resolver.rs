//! Multi-target route resolution: origin coordinate + candidate
//! destinations → the nearest-by-path destination and its route.
//!
//! One single-source search serves every destination, which is cheaper than
//! one query per destination whenever the destination set is small relative
//! to the graph (the usual handful of shelters).
//!
//! Failure is data.  [`RouteResult::Failure`] covers every expected
//! outcome (origin off the map, no reachable destination), so nothing here
//! returns `Err` or panics on valid input.

use thiserror::Error;
use tracing::{debug, warn};

use er_core::{EdgeId, GeoPoint, NodeId};

use crate::network::RoadNetwork;
use crate::router::{DijkstraRouter, Router};
use crate::SpatialResult;

// ── Result types ──────────────────────────────────────────────────────────────

/// A successful evacuation route.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Position of the chosen destination in the caller's slice.
    pub destination_index: usize,
    /// Total length in metres; equals the sum of `edges` lengths.
    pub distance_m: f64,
    /// Road nodes from origin to destination, both included.
    pub nodes: Vec<NodeId>,
    /// Edges traversed, in order.  Empty when origin and destination snap
    /// to the same node.
    pub edges: Vec<EdgeId>,
    /// Coordinates of `nodes`.
    pub coordinates: Vec<GeoPoint>,
}

impl Route {
    pub fn is_trivial(&self) -> bool {
        self.edges.is_empty()
    }

    /// Sum of the lengths of the traversed edges.
    pub fn edge_length_sum(&self, network: &RoadNetwork) -> f64 {
        self.edges.iter().map(|&e| network.edge_length_m(e)).sum()
    }

    /// Full road shape of the route: every edge polyline, joined end to end.
    pub fn geometry(&self, network: &RoadNetwork) -> Vec<GeoPoint> {
        let mut points: Vec<GeoPoint> = Vec::new();
        for &e in &self.edges {
            for c in network.edge_geometry(e).coords() {
                let p = GeoPoint::new(c.y, c.x);
                if points.last() != Some(&p) {
                    points.push(p);
                }
            }
        }
        if points.is_empty() {
            points.extend(self.coordinates.first().copied());
        }
        points
    }
}

/// Why no route was produced.  `Display` is the user-facing reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteFailure {
    #[error("location {0} is not near any road")]
    OriginNotFound(GeoPoint),

    #[error("no shelter is near any road")]
    NoDestinationMatched,

    #[error("No safe route found")]
    NoRouteFound,
}

impl RouteFailure {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Outcome of one routing request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResult {
    Success(Route),
    Failure(RouteFailure),
}

impl RouteResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RouteResult::Success(_))
    }

    pub fn route(&self) -> Option<&Route> {
        match self {
            RouteResult::Success(r) => Some(r),
            RouteResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&RouteFailure> {
        match self {
            RouteResult::Success(_) => None,
            RouteResult::Failure(f) => Some(f),
        }
    }

    pub fn into_result(self) -> Result<Route, RouteFailure> {
        match self {
            RouteResult::Success(r) => Ok(r),
            RouteResult::Failure(f) => Err(f),
        }
    }
}

impl From<RouteFailure> for RouteResult {
    fn from(f: RouteFailure) -> Self {
        RouteResult::Failure(f)
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────────

/// Snapping radius used by [`find_best_route`]: a coordinate more than
/// 10 km from every road node is outside the network.
pub const DEFAULT_SNAP_RADIUS_M: f64 = 10_000.0;

/// Best route from `origin` to any of `destinations` with the default
/// [`DijkstraRouter`] and [`DEFAULT_SNAP_RADIUS_M`].
pub fn find_best_route(
    network:      &RoadNetwork,
    origin:       GeoPoint,
    destinations: &[GeoPoint],
) -> RouteResult {
    find_best_route_with(
        &DijkstraRouter,
        network,
        origin,
        destinations,
        Some(DEFAULT_SNAP_RADIUS_M),
    )
}

/// Best route from `origin` to any of `destinations`.
///
/// 1. Snap `origin` to its nearest node (within `max_snap_m` if given).
///    Invalid coordinates (NaN, out of range) never snap.
/// 2. Snap each destination; unsnappable destinations are skipped.
/// 3. Run one search from the origin node towards all snapped destinations.
/// 4. Pick the smallest distance; equal distances go to the lower index.
pub fn find_best_route_with<R: Router + ?Sized>(
    router:       &R,
    network:      &RoadNetwork,
    origin:       GeoPoint,
    destinations: &[GeoPoint],
    max_snap_m:   Option<f64>,
) -> RouteResult {
    let Ok(origin_node) = snap(network, origin, max_snap_m) else {
        return RouteFailure::OriginNotFound(origin).into();
    };

    let snapped: Vec<(usize, NodeId)> = destinations
        .iter()
        .enumerate()
        .filter_map(|(i, &pos)| match snap(network, pos, max_snap_m) {
            Ok(node) => Some((i, node)),
            Err(e) => {
                debug!(destination = i, error = %e, "skipping destination");
                None
            }
        })
        .collect();
    if snapped.is_empty() {
        return RouteFailure::NoDestinationMatched.into();
    }

    let targets: Vec<NodeId> = snapped.iter().map(|&(_, n)| n).collect();
    let tree = match router.shortest_paths(network, origin_node, &targets) {
        Ok(tree) => tree,
        Err(e) => {
            warn!(error = %e, "shortest-path search failed");
            return RouteFailure::NoRouteFound.into();
        }
    };

    // Strict `<` over ascending indices keeps the lowest index on ties.
    let mut best: Option<(usize, NodeId, f64)> = None;
    for &(i, node) in &snapped {
        if let Some(d) = tree.distance_to(node) {
            if best.is_none_or(|(_, _, best_d)| d < best_d) {
                best = Some((i, node, d));
            }
        }
    }

    let Some((destination_index, dest_node, distance_m)) = best else {
        return RouteFailure::NoRouteFound.into();
    };
    let Some(edges) = tree.path_edges(network, dest_node) else {
        return RouteFailure::NoRouteFound.into();
    };

    let nodes: Vec<NodeId> = std::iter::once(origin_node)
        .chain(edges.iter().map(|&e| network.edge_endpoints(e).1))
        .collect();
    let coordinates = nodes.iter().map(|&n| network.node_pos(n)).collect();

    debug!(destination_index, distance_m, hops = edges.len(), "route resolved");
    RouteResult::Success(Route { destination_index, distance_m, nodes, edges, coordinates })
}

fn snap(network: &RoadNetwork, pos: GeoPoint, max_snap_m: Option<f64>) -> SpatialResult<NodeId> {
    match max_snap_m {
        Some(max_m) => network.nearest_node_within(pos, max_m),
        None => network.nearest_node(pos),
    }
}
