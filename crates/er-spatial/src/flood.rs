//! Flood blocking pass.
//!
//! One bulk pass per flood-data version: every non-removed edge whose
//! polyline intersects the [`FloodRegion`] is marked
//! [`EdgeStatus::Blocked`](crate::EdgeStatus::Blocked).
//!
//! Candidate pairs come from the edge R-tree (one envelope query per
//! polygon), so the exact `geo` predicate only runs on edges that are
//! already close to water.
//!
//! Blocking is cumulative.  Re-applying the same region is a no-op, and an
//! empty region unblocks nothing; callers wanting a fresh view call
//! [`RoadNetwork::reset_blocking`] first (or clone an unblocked baseline).

use geo::BoundingRect;
use tracing::{debug, info};

use er_core::EdgeId;

use crate::geometry::FloodRegion;
use crate::network::{EdgeStatus, RoadNetwork};

/// Block every edge that intersects `region` and return the sorted ids of
/// all edges the region covers (including ones blocked by an earlier pass).
pub fn apply_flood_blocking(network: &mut RoadNetwork, region: &FloodRegion) -> Vec<EdgeId> {
    let flooded = flooded_edges(network, region);

    let mut newly_blocked = 0usize;
    for &edge in &flooded {
        // Ids come from the network's own index, so lookups cannot fail.
        if let Ok(true) = network.block_edge(edge) {
            newly_blocked += 1;
        }
    }

    info!(
        polygons = region.polygon_count(),
        flooded = flooded.len(),
        newly_blocked,
        "flood blocking pass complete"
    );
    flooded
}

/// Read-only half of [`apply_flood_blocking`]: sorted ids of every
/// non-removed edge whose geometry intersects `region`.
pub fn flooded_edges(network: &RoadNetwork, region: &FloodRegion) -> Vec<EdgeId> {
    if region.is_empty() || network.edge_count() == 0 {
        return Vec::new();
    }

    let mut candidates: Vec<EdgeId> = region
        .polygons()
        .iter()
        .filter_map(|poly| poly.bounding_rect())
        .flat_map(|rect| network.edges_in_rect(rect))
        .filter(|&e| matches!(network.edge_status(e), Ok(s) if s != EdgeStatus::Removed))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    debug!(candidates = candidates.len(), "flood pass candidate edges");

    let hits = exact_hits(network, region, candidates);
    debug_assert!(hits.windows(2).all(|w| w[0] < w[1]));
    hits
}

#[cfg(not(feature = "parallel"))]
fn exact_hits(network: &RoadNetwork, region: &FloodRegion, candidates: Vec<EdgeId>) -> Vec<EdgeId> {
    candidates
        .into_iter()
        .filter(|&e| region.intersects(network.edge_geometry(e)))
        .collect()
}

#[cfg(feature = "parallel")]
fn exact_hits(network: &RoadNetwork, region: &FloodRegion, candidates: Vec<EdgeId>) -> Vec<EdgeId> {
    use rayon::prelude::*;

    // Collecting into a `Vec` keeps the sorted input order.
    candidates
        .into_par_iter()
        .filter(|&e| region.intersects(network.edge_geometry(e)))
        .collect()
}
