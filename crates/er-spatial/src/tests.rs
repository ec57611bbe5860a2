//! Unit tests for er-spatial.
//!
//! All tests use hand-crafted networks near (13.0°N, 80.0°E) so they run
//! without any road data file.  One grid unit is 0.001° (≈ 111 m).

#[cfg(test)]
mod helpers {
    use er_core::{GeoPoint, NodeId};
    use geo::Polygon;

    use crate::{RoadNetwork, RoadNetworkBuilder, polygon_from_ring};

    pub const LAT0: f64 = 13.0;
    pub const LON0: f64 = 80.0;
    pub const UNIT: f64 = 0.001;

    /// Grid position `(row, col)` in units of [`UNIT`] from the base point.
    pub fn at(row: f64, col: f64) -> GeoPoint {
        GeoPoint::new(LAT0 + row * UNIT, LON0 + col * UNIT)
    }

    /// Axis-aligned square polygon around `center` (grid units), half-size `h`.
    pub fn square(center_row: f64, center_col: f64, h: f64) -> Polygon<f64> {
        polygon_from_ring(&[
            at(center_row - h, center_col - h),
            at(center_row - h, center_col + h),
            at(center_row + h, center_col + h),
            at(center_row + h, center_col - h),
        ])
    }

    /// Small grid network.
    ///
    /// Nodes (row, col):
    ///   0:(0,0)  1:(0,1)  2:(0,2)
    ///   3:(1,0)           4:(1,2)
    ///
    /// Two-way roads (length m): 0-1 100, 1-2 100, 2-4 100, 0-3 500, 3-4 100
    ///
    /// Shortest 0→4 is 0→1→2→4 = 300 m; the detour 0→3→4 is 600 m.
    pub fn grid_network() -> (RoadNetwork, [NodeId; 5]) {
        let mut b = RoadNetworkBuilder::new();
        let n0 = b.add_node(at(0.0, 0.0));
        let n1 = b.add_node(at(0.0, 1.0));
        let n2 = b.add_node(at(0.0, 2.0));
        let n3 = b.add_node(at(1.0, 0.0));
        let n4 = b.add_node(at(1.0, 2.0));

        b.add_road(n0, n1, 100.0).unwrap();
        b.add_road(n1, n2, 100.0).unwrap();
        b.add_road(n2, n4, 100.0).unwrap();
        b.add_road(n0, n3, 500.0).unwrap();
        b.add_road(n3, n4, 100.0).unwrap();

        (b.build(), [n0, n1, n2, n3, n4])
    }

    /// One-way chain A→B→C with lengths 100 m and 150 m.
    pub fn line_network() -> (RoadNetwork, [NodeId; 3]) {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let bb = b.add_node(at(0.0, 1.0));
        let c = b.add_node(at(0.0, 2.5));
        b.add_edge(a, bb, 100.0).unwrap();
        b.add_edge(bb, c, 150.0).unwrap();
        (b.build(), [a, bb, c])
    }

    /// `side` × `side` lattice with two-way roads to the right and below,
    /// lengths derived from geometry.
    pub fn lattice(side: usize) -> RoadNetwork {
        let mut b = RoadNetworkBuilder::new();
        let mut ids = Vec::new();
        for r in 0..side {
            for c in 0..side {
                ids.push(b.add_node(at(r as f64, c as f64)));
            }
        }
        for r in 0..side {
            for c in 0..side {
                let here = ids[r * side + c];
                if c + 1 < side {
                    b.add_road_with_geometry(here, ids[r * side + c + 1], &[], None).unwrap();
                }
                if r + 1 < side {
                    b.add_road_with_geometry(here, ids[(r + 1) * side + c], &[], None).unwrap();
                }
            }
        }
        b.build()
    }
}

// ── Geometry ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod geometry {
    use approx::assert_abs_diff_eq;
    use er_core::{GeoPoint, LocalProjection};
    use geo::{LineString, Polygon};

    use super::helpers::{at, square};
    use crate::{FloodRegion, intersects, line_string, polygon_from_ring, polyline_length_m};

    #[test]
    fn crossing_line_intersects() {
        let region = FloodRegion::from_polygons([square(0.0, 0.0, 1.0)]);
        let line = line_string(&[at(0.0, -3.0), at(0.0, 3.0)]);
        assert!(intersects(&line, &region));
    }

    #[test]
    fn disjoint_line_does_not_intersect() {
        let region = FloodRegion::from_polygons([square(0.0, 0.0, 1.0)]);
        let line = line_string(&[at(5.0, -3.0), at(5.0, 3.0)]);
        assert!(!intersects(&line, &region));
    }

    #[test]
    fn line_inside_interior_intersects() {
        let region = FloodRegion::from_polygons([square(0.0, 0.0, 2.0)]);
        let line = line_string(&[at(0.0, -0.5), at(0.0, 0.5)]);
        assert!(intersects(&line, &region));
    }

    #[test]
    fn line_touching_boundary_intersects() {
        let region = FloodRegion::from_polygons([square(0.0, 0.0, 1.0)]);
        let line = line_string(&[at(0.0, 1.0), at(0.0, 3.0)]);
        assert!(intersects(&line, &region));
    }

    #[test]
    fn line_inside_hole_does_not_intersect() {
        let outer = square(0.0, 0.0, 3.0);
        let hole = square(0.0, 0.0, 1.0);
        let poly = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);
        let region = FloodRegion::from_polygons([poly]);
        let line = line_string(&[at(0.0, -0.5), at(0.0, 0.5)]);
        assert!(!intersects(&line, &region));
    }

    #[test]
    fn empty_inputs_never_intersect() {
        let region = FloodRegion::from_polygons([square(0.0, 0.0, 1.0)]);
        assert!(!intersects(&LineString::new(vec![]), &region));

        let line = line_string(&[at(0.0, -3.0), at(0.0, 3.0)]);
        assert!(!intersects(&line, &FloodRegion::empty()));
    }

    #[test]
    fn degenerate_polygons_are_dropped() {
        let region = FloodRegion::from_polygons([
            polygon_from_ring(&[]),
            square(0.0, 0.0, 1.0),
        ]);
        assert_eq!(region.polygon_count(), 1);
    }

    #[test]
    fn buffer_radius_is_ground_distance() {
        let center = GeoPoint::new(13.0827, 80.2707);
        let region = FloodRegion::buffer(center, 2_000.0, 64);
        assert_eq!(region.polygon_count(), 1);

        for c in region.polygons()[0].exterior().coords() {
            let d = center.distance_m(GeoPoint::new(c.y, c.x));
            assert_abs_diff_eq!(d, 2_000.0, epsilon = 20.0);
        }

        let proj = LocalProjection::new(center);
        let inside = line_string(&[proj.unproject([1_500.0, 0.0]), proj.unproject([1_600.0, 0.0])]);
        let outside = line_string(&[proj.unproject([2_500.0, 0.0]), proj.unproject([2_600.0, 0.0])]);
        assert!(region.intersects(&inside));
        assert!(!region.intersects(&outside));
    }

    #[test]
    fn buffer_with_bad_radius_is_empty() {
        let center = GeoPoint::new(13.0, 80.0);
        assert!(FloodRegion::buffer(center, 0.0, 16).is_empty());
        assert!(FloodRegion::buffer(center, f64::NAN, 16).is_empty());
    }

    #[test]
    fn merge_keeps_all_polygons() {
        let a = FloodRegion::from_polygons([square(0.0, 0.0, 1.0)]);
        let b = FloodRegion::from_polygons([square(10.0, 10.0, 1.0), square(20.0, 20.0, 1.0)]);
        let merged = a.merge(b);
        assert_eq!(merged.polygon_count(), 3);

        let line = line_string(&[at(20.0, 15.0), at(20.0, 25.0)]);
        assert!(merged.intersects(&line));
    }

    #[test]
    fn bounding_rect_spans_all_polygons() {
        let region = FloodRegion::from_polygons([square(0.0, 0.0, 1.0), square(10.0, 10.0, 1.0)]);
        let rect = region.bounding_rect().unwrap();
        assert_abs_diff_eq!(rect.min().y, at(-1.0, 0.0).lat, epsilon = 1e-12);
        assert_abs_diff_eq!(rect.max().x, at(0.0, 11.0).lon, epsilon = 1e-12);
        assert!(FloodRegion::empty().bounding_rect().is_none());
    }

    #[test]
    fn polyline_length_sums_segments() {
        let pts = [at(0.0, 0.0), at(0.0, 1.0), at(1.0, 1.0)];
        let expected = pts[0].distance_m(pts[1]) + pts[1].distance_m(pts[2]);
        assert_abs_diff_eq!(polyline_length_m(&pts), expected, epsilon = 1e-9);
        assert_eq!(polyline_length_m(&pts[..1]), 0.0);
    }
}

// ── Builder & network structure ───────────────────────────────────────────────

#[cfg(test)]
mod builder {
    use approx::assert_abs_diff_eq;
    use er_core::{GeoPoint, NodeId};

    use super::helpers::at;
    use crate::{RoadNetworkBuilder, SpatialError};

    #[test]
    fn empty_build() {
        let net = RoadNetworkBuilder::new().build();
        assert_eq!(net.node_count(), 0);
        assert_eq!(net.edge_count(), 0);
        assert!(net.is_empty());
    }

    #[test]
    fn single_road_is_bidirectional() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(GeoPoint::new(13.06, 80.24));
        let c = b.add_node(GeoPoint::new(13.07, 80.24));
        b.add_road(a, c, 1_100.0).unwrap();
        let net = b.build();
        assert_eq!(net.node_count(), 2);
        assert_eq!(net.edge_count(), 2);
    }

    #[test]
    fn rejects_unknown_node() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let err = b.add_edge(a, NodeId(7), 10.0).unwrap_err();
        assert!(matches!(err, SpatialError::NodeNotFound(NodeId(7))));
        assert_eq!(b.edge_count(), 0);
    }

    #[test]
    fn rejects_bad_length() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(0.0, 1.0));
        assert!(matches!(
            b.add_edge(a, c, -1.0),
            Err(SpatialError::InvalidLength { .. })
        ));
        assert!(b.add_edge(a, c, f64::INFINITY).is_err());
        assert!(b.add_edge(a, c, 0.0).is_ok());
    }

    #[test]
    fn length_derived_from_geometry() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(1.0, 1.0));
        let bend = [at(0.0, 0.0), at(0.0, 1.0), at(1.0, 1.0)];
        b.add_edge_with_geometry(a, c, &bend, None).unwrap();
        let net = b.build();

        let e = net.edges_between(a, c).next().unwrap();
        let expected = bend[0].distance_m(bend[1]) + bend[1].distance_m(bend[2]);
        assert_abs_diff_eq!(net.edge_length_m(e), expected, epsilon = 1e-9);
        assert_eq!(net.edge_geometry(e).0.len(), 3);
    }

    #[test]
    fn reverse_edge_gets_reversed_geometry() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(1.0, 1.0));
        b.add_road_with_geometry(a, c, &[at(0.0, 0.0), at(0.0, 1.0), at(1.0, 1.0)], None)
            .unwrap();
        let net = b.build();

        let back = net.edges_between(c, a).next().unwrap();
        let first = net.edge_geometry(back).0[0];
        assert_eq!((first.y, first.x), (at(1.0, 1.0).lat, at(1.0, 1.0).lon));
    }

    #[test]
    fn csr_out_edges() {
        let (net, [n0, n1, n2, n3, n4]) = super::helpers::grid_network();
        assert_eq!(net.out_edges(n1).count(), 2);
        assert_eq!(net.open_out_degree(n0), 2);
        assert_eq!(net.open_out_degree(n2), 2);
        assert_eq!(net.open_out_degree(n3), 2);
        assert_eq!(net.open_out_degree(n4), 2);
        for e in net.out_edges(n0) {
            assert_eq!(net.edge_endpoints(e).0, n0);
        }
    }

    #[test]
    fn build_indexed_maps_insertion_order() {
        let mut b = RoadNetworkBuilder::new();
        let n0 = b.add_node(at(0.0, 0.0));
        let n1 = b.add_node(at(0.0, 1.0));
        let n2 = b.add_node(at(0.0, 2.0));
        // Inserted out of source order so the CSR sort reorders them.
        b.add_edge(n2, n1, 30.0).unwrap();
        b.add_edge(n0, n1, 10.0).unwrap();
        b.add_edge(n1, n2, 20.0).unwrap();
        let (net, ids) = b.build_indexed();

        assert_eq!(ids.len(), 3);
        assert_eq!(net.edge_endpoints(ids[0]), (n2, n1));
        assert_eq!(net.edge_endpoints(ids[1]), (n0, n1));
        assert_eq!(net.edge_endpoints(ids[2]), (n1, n2));
        assert_eq!(net.edge_length_m(ids[0]), 30.0);
    }

    #[test]
    fn neighbors_report_length_and_target() {
        let (net, [n0, n1, _, n3, _]) = super::helpers::grid_network();
        let mut seen: Vec<_> = net.neighbors(n0).map(|(_, to, len)| (to, len)).collect();
        seen.sort_by_key(|&(to, _)| to);
        assert_eq!(seen, vec![(n1, 100.0), (n3, 500.0)]);
    }

    #[test]
    fn parallel_edges_are_kept() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(0.0, 1.0));
        b.add_edge(a, c, 120.0).unwrap();
        b.add_edge(a, c, 90.0).unwrap();
        let net = b.build();

        let lengths: Vec<f64> = net.edges_between(a, c).map(|e| net.edge_length_m(e)).collect();
        assert_eq!(lengths, vec![120.0, 90.0]); // insertion order preserved
    }
}

// ── Edge status ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod status {
    use er_core::EdgeId;

    use crate::{EdgeStatus, SpatialError};

    #[test]
    fn remove_edge_hides_it_from_neighbors() {
        let (mut net, [n0, n1, ..]) = super::helpers::grid_network();
        let e = net.edges_between(n0, n1).next().unwrap();
        net.remove_edge(e).unwrap();

        assert_eq!(net.edge_status(e).unwrap(), EdgeStatus::Removed);
        assert!(net.neighbors(n0).all(|(edge, _, _)| edge != e));
        assert_eq!(net.open_out_degree(n0), 1);
        // The CSR slot itself is untouched.
        assert!(net.out_edges(n0).any(|edge| edge == e));
    }

    #[test]
    fn remove_unknown_edge_fails() {
        let (mut net, _) = super::helpers::grid_network();
        assert!(matches!(
            net.remove_edge(EdgeId(999)),
            Err(SpatialError::EdgeNotFound(EdgeId(999)))
        ));
        assert!(net.edge_status(EdgeId(999)).is_err());
    }

    #[test]
    fn block_reports_transitions() {
        let (mut net, [n0, n1, ..]) = super::helpers::grid_network();
        let e = net.edges_between(n0, n1).next().unwrap();
        assert!(net.block_edge(e).unwrap());
        assert!(!net.block_edge(e).unwrap());
        assert!(!net.is_open(e));
        assert_eq!(net.blocked_edges(), vec![e]);
    }

    #[test]
    fn reset_reopens_blocked_but_not_removed() {
        let (mut net, [n0, n1, n2, ..]) = super::helpers::grid_network();
        let blocked = net.edges_between(n0, n1).next().unwrap();
        let removed = net.edges_between(n1, n2).next().unwrap();
        net.block_edge(blocked).unwrap();
        net.remove_edge(removed).unwrap();

        assert_eq!(net.reset_blocking(), 1);
        assert!(net.is_open(blocked));
        assert_eq!(net.edge_status(removed).unwrap(), EdgeStatus::Removed);
        assert!(!net.block_edge(removed).unwrap());
        assert_eq!(net.open_edge_count(), net.edge_count() - 1);
    }
}

// ── Spatial snap ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod snap {
    use er_core::GeoPoint;

    use super::helpers::at;
    use crate::{RoadNetworkBuilder, SpatialError};

    #[test]
    fn snap_exact_position() {
        let (net, [n0, ..]) = super::helpers::grid_network();
        assert_eq!(net.nearest_node(at(0.0, 0.0)).unwrap(), n0);
    }

    #[test]
    fn snap_nearest() {
        let (net, [n0, n1, ..]) = super::helpers::grid_network();
        assert_eq!(net.nearest_node(at(0.0, 0.4)).unwrap(), n0);
        assert_eq!(net.nearest_node(at(0.0, 0.6)).unwrap(), n1);
    }

    #[test]
    fn empty_network_is_not_found() {
        let net = RoadNetworkBuilder::new().build();
        assert!(matches!(
            net.nearest_node(GeoPoint::new(0.0, 0.0)),
            Err(SpatialError::NoNearbyNode { .. })
        ));
    }

    #[test]
    fn far_outside_extent_is_not_found() {
        let (net, [_, _, _, _, n4]) = super::helpers::grid_network();
        // ~111 km north of the grid.
        let far = GeoPoint::new(14.0, 80.0);
        assert!(net.nearest_node(far).is_ok());
        assert!(matches!(
            net.nearest_node_within(far, 1_000.0),
            Err(SpatialError::NoNearbyNode { .. })
        ));
        assert_eq!(net.nearest_node_within(at(1.2, 2.0), 50.0).unwrap(), n4);
    }

    #[test]
    fn non_finite_coordinates_are_not_found() {
        let (net, _) = super::helpers::grid_network();
        for pos in [
            GeoPoint::new(f64::NAN, 80.0),
            GeoPoint::new(13.0, f64::INFINITY),
            GeoPoint::new(f64::NAN, f64::NAN),
            GeoPoint::new(95.0, 80.0),
        ] {
            assert!(matches!(net.nearest_node(pos), Err(SpatialError::NoNearbyNode { .. })));
            assert!(matches!(
                net.nearest_node_within(pos, 1e9),
                Err(SpatialError::NoNearbyNode { .. })
            ));
        }
    }
}

// ── Flood blocking pass ───────────────────────────────────────────────────────

#[cfg(test)]
mod flood {
    use geo::Intersects;

    use super::helpers::{at, grid_network, lattice, square};
    use crate::{
        EdgeStatus, FloodRegion, RoadNetwork, apply_flood_blocking, find_best_route,
        flooded_edges, polygon_from_ring,
    };

    fn brute_force_intersects(net: &RoadNetwork, region: &FloodRegion, e: er_core::EdgeId) -> bool {
        region.polygons().iter().any(|p| net.edge_geometry(e).intersects(p))
    }

    #[test]
    fn blocked_iff_intersects_exhaustive() {
        let mut net = lattice(10);
        let region = FloodRegion::from_polygons([
            square(2.5, 2.5, 1.2),
            polygon_from_ring(&[at(6.0, 6.0), at(9.5, 6.0), at(6.0, 9.5)]),
        ]);
        let blocked = apply_flood_blocking(&mut net, &region);
        assert!(!blocked.is_empty());

        for e in er_core::EdgeId::range(net.edge_count()) {
            let expected = brute_force_intersects(&net, &region, e);
            let is_blocked = net.edge_status(e).unwrap() == EdgeStatus::Blocked;
            assert_eq!(is_blocked, expected, "edge {e}");
            assert_eq!(blocked.binary_search(&e).is_ok(), expected, "edge {e}");
        }
    }

    #[test]
    fn both_directions_of_a_road_are_blocked() {
        let (mut net, [_, n1, n2, ..]) = grid_network();
        // Covers the middle of road 1-2 only.
        let region = FloodRegion::from_polygons([square(0.0, 1.5, 0.2)]);
        let blocked = apply_flood_blocking(&mut net, &region);

        let forward = net.edges_between(n1, n2).next().unwrap();
        let backward = net.edges_between(n2, n1).next().unwrap();
        let mut expected = vec![forward, backward];
        expected.sort();
        assert_eq!(blocked, expected);
    }

    #[test]
    fn idempotent() {
        let mut net = lattice(6);
        let region = FloodRegion::from_polygons([square(2.0, 3.0, 1.5)]);

        let first = apply_flood_blocking(&mut net, &region);
        let statuses_after_first = net.blocked_edges();
        let second = apply_flood_blocking(&mut net, &region);

        assert_eq!(first, second);
        assert_eq!(net.blocked_edges(), statuses_after_first);
        assert_eq!(net.blocked_edges(), first);
    }

    #[test]
    fn empty_region_does_not_unblock() {
        let mut net = lattice(5);
        let region = FloodRegion::from_polygons([square(2.0, 2.0, 0.6)]);
        let blocked = apply_flood_blocking(&mut net, &region);

        assert!(apply_flood_blocking(&mut net, &FloodRegion::empty()).is_empty());
        assert_eq!(net.blocked_edges(), blocked);

        net.reset_blocking();
        assert!(net.blocked_edges().is_empty());
    }

    #[test]
    fn blocking_is_cumulative_across_regions() {
        let mut net = lattice(8);
        let a = FloodRegion::from_polygons([square(1.0, 1.0, 0.4)]);
        let b = FloodRegion::from_polygons([square(6.0, 6.0, 0.4)]);
        let from_a = apply_flood_blocking(&mut net, &a);
        let from_b = apply_flood_blocking(&mut net, &b);

        let mut union: Vec<_> = from_a.iter().chain(&from_b).copied().collect();
        union.sort();
        union.dedup();
        assert_eq!(net.blocked_edges(), union);
    }

    #[test]
    fn removed_edges_are_not_reported() {
        let (mut net, [_, n1, n2, ..]) = grid_network();
        let forward = net.edges_between(n1, n2).next().unwrap();
        net.remove_edge(forward).unwrap();

        let region = FloodRegion::from_polygons([square(0.0, 1.5, 0.2)]);
        let blocked = apply_flood_blocking(&mut net, &region);
        assert!(!blocked.contains(&forward));
        assert_eq!(blocked.len(), 1);
        assert_eq!(net.edge_status(forward).unwrap(), EdgeStatus::Removed);
    }

    #[test]
    fn flooded_edges_does_not_mutate() {
        let (net, _) = grid_network();
        let region = FloodRegion::from_polygons([square(0.0, 1.5, 0.2)]);
        assert_eq!(flooded_edges(&net, &region).len(), 2);
        assert!(net.blocked_edges().is_empty());
    }

    #[test]
    fn disjoint_region_changes_nothing() {
        let (mut net, _) = grid_network();
        let origin = at(0.0, 0.0);
        let shelters = [at(1.0, 2.0)];
        let baseline = find_best_route(&net, origin, &shelters);

        let far_away = FloodRegion::from_polygons([square(500.0, 500.0, 10.0)]);
        let blocked = apply_flood_blocking(&mut net, &far_away);

        assert!(blocked.is_empty());
        assert!(net.blocked_edges().is_empty());
        assert_eq!(find_best_route(&net, origin, &shelters), baseline);
    }
}

// ── Dijkstra routing ──────────────────────────────────────────────────────────

#[cfg(test)]
mod routing {
    use er_core::NodeId;

    use super::helpers::{at, grid_network};
    use crate::{DijkstraRouter, Router, RoadNetworkBuilder, SpatialError};

    #[test]
    fn trivial_same_node() {
        let (net, [n0, ..]) = grid_network();
        let p = DijkstraRouter.route(&net, n0, n0).unwrap();
        assert!(p.is_trivial());
        assert_eq!(p.length_m, 0.0);
        assert_eq!(p.nodes, vec![n0]);
    }

    #[test]
    fn shortest_path_correct() {
        let (net, [n0, n1, n2, _, n4]) = grid_network();
        let p = DijkstraRouter.route(&net, n0, n4).unwrap();
        assert_eq!(p.length_m, 300.0);
        assert_eq!(p.nodes, vec![n0, n1, n2, n4]);
        assert_eq!(p.edges.len(), 3);
        assert_eq!(net.edge_endpoints(p.edges[0]), (n0, n1));
    }

    #[test]
    fn blocked_edge_forces_detour() {
        let (mut net, [n0, n1, n2, n3, n4]) = grid_network();
        let e = net.edges_between(n1, n2).next().unwrap();
        net.block_edge(e).unwrap();

        let p = DijkstraRouter.route(&net, n0, n4).unwrap();
        assert_eq!(p.length_m, 600.0);
        assert_eq!(p.nodes, vec![n0, n3, n4]);
    }

    #[test]
    fn no_route_disconnected() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(1.0, 0.0));
        let net = b.build();
        assert!(matches!(
            DijkstraRouter.route(&net, a, c),
            Err(SpatialError::NoRoute { .. })
        ));
    }

    #[test]
    fn directed_one_way_blocks_return() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(0.0, 1.0));
        b.add_edge(a, c, 100.0).unwrap();
        let net = b.build();

        assert!(DijkstraRouter.route(&net, a, c).is_ok());
        assert!(DijkstraRouter.route(&net, c, a).is_err());
    }

    #[test]
    fn unknown_origin_is_an_error() {
        let (net, [n0, ..]) = grid_network();
        assert!(matches!(
            DijkstraRouter.shortest_paths(&net, NodeId(42), &[n0]),
            Err(SpatialError::NodeNotFound(NodeId(42)))
        ));
    }

    #[test]
    fn full_tree_without_targets() {
        let (net, nodes) = grid_network();
        let tree = DijkstraRouter.shortest_paths(&net, nodes[0], &[]).unwrap();
        assert_eq!(tree.origin(), nodes[0]);
        let dists: Vec<f64> = nodes.iter().map(|&n| tree.distance_to(n).unwrap()).collect();
        // n3 is reached via 0→1→2→4→3 (400 m), not the 500 m direct road.
        assert_eq!(dists, vec![0.0, 100.0, 200.0, 400.0, 300.0]);
        assert!(tree.path_edges(&net, nodes[0]).unwrap().is_empty());
    }

    #[test]
    fn early_stop_hides_unsettled_nodes() {
        let (net, [n0, n1, _, n3, _]) = grid_network();
        let tree = DijkstraRouter.shortest_paths(&net, n0, &[n1]).unwrap();
        assert_eq!(tree.distance_to(n1), Some(100.0));
        // n3 had a tentative 500 m label when the search stopped.
        assert!(!tree.is_reached(n3));
        assert_eq!(tree.distance_to(n3), None);
        assert!(tree.path_edges(&net, n3).is_none());
    }
}

// ── Multi-target resolution ───────────────────────────────────────────────────

#[cfg(test)]
mod resolver {
    use approx::assert_abs_diff_eq;
    use er_core::GeoPoint;

    use super::helpers::{at, grid_network, line_network};
    use crate::{
        DijkstraRouter, RoadNetworkBuilder, RouteFailure, RouteResult, find_best_route,
        find_best_route_with,
    };

    #[test]
    fn single_path_no_blocking() {
        let (net, [a, b, c]) = line_network();
        let result = find_best_route(&net, net.node_pos(a), &[net.node_pos(c)]);
        let route = result.route().expect("route expected");

        assert_eq!(route.distance_m, 250.0);
        assert_eq!(route.nodes, vec![a, b, c]);
        assert_eq!(
            route.coordinates,
            vec![net.node_pos(a), net.node_pos(b), net.node_pos(c)]
        );
        assert_eq!(route.destination_index, 0);
    }

    #[test]
    fn blocked_link_means_no_route() {
        let (mut net, [a, b, c]) = line_network();
        let e = net.edges_between(b, c).next().unwrap();
        net.block_edge(e).unwrap();

        let result = find_best_route(&net, net.node_pos(a), &[net.node_pos(c)]);
        assert_eq!(result, RouteResult::Failure(RouteFailure::NoRouteFound));
        assert_eq!(result.failure().unwrap().reason(), "No safe route found");
    }

    #[test]
    fn nearest_of_two_shelters() {
        let mut b = RoadNetworkBuilder::new();
        let origin = b.add_node(at(0.0, 0.0));
        let east = b.add_node(at(0.0, 3.0));
        let west = b.add_node(at(0.0, -5.0));
        b.add_road(origin, east, 300.0).unwrap();
        b.add_road(origin, west, 500.0).unwrap();
        let net = b.build();

        // Farther shelter listed first.
        let result = find_best_route(&net, at(0.0, 0.0), &[at(0.0, -5.0), at(0.0, 3.0)]);
        let route = result.route().unwrap();
        assert_eq!(route.destination_index, 1);
        assert_eq!(route.distance_m, 300.0);
        assert_eq!(route.nodes, vec![origin, east]);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let mut b = RoadNetworkBuilder::new();
        let origin = b.add_node(at(0.0, 0.0));
        let east = b.add_node(at(0.0, 2.0));
        let west = b.add_node(at(0.0, -2.0));
        b.add_road(origin, east, 200.0).unwrap();
        b.add_road(origin, west, 200.0).unwrap();
        let net = b.build();

        let r = find_best_route(&net, at(0.0, 0.0), &[at(0.0, 2.0), at(0.0, -2.0)]);
        assert_eq!(r.route().unwrap().destination_index, 0);
        let r = find_best_route(&net, at(0.0, 0.0), &[at(0.0, -2.0), at(0.0, 2.0)]);
        assert_eq!(r.route().unwrap().destination_index, 0);
    }

    #[test]
    fn duplicate_destinations_pick_first() {
        let (net, [_, _, c]) = line_network();
        let shelter = net.node_pos(c);
        let r = find_best_route(&net, at(0.0, 0.0), &[shelter, shelter]);
        assert_eq!(r.route().unwrap().destination_index, 0);
    }

    #[test]
    fn picks_reachable_over_unreachable() {
        let (mut net, [n0, n1, n2, _, n4]) = grid_network();
        // Cut every road into n2 so it becomes unreachable.
        for from in [n1, n4] {
            let e = net.edges_between(from, n2).next().unwrap();
            net.block_edge(e).unwrap();
        }
        let r = find_best_route(&net, net.node_pos(n0), &[net.node_pos(n2), net.node_pos(n4)]);
        let route = r.route().unwrap();
        assert_eq!(route.destination_index, 1);
        assert_eq!(route.distance_m, 600.0);
    }

    #[test]
    fn isolated_origin_has_no_route() {
        let (mut net, [n0, .., n4]) = grid_network();
        let out: Vec<_> = net.out_edges(n0).collect();
        for e in out {
            net.block_edge(e).unwrap();
        }
        let r = find_best_route(&net, net.node_pos(n0), &[net.node_pos(n4)]);
        assert_eq!(r, RouteResult::Failure(RouteFailure::NoRouteFound));
    }

    #[test]
    fn distance_matches_traversed_edges() {
        let (mut net, [n0, n1, n2, n3, n4]) = grid_network();
        for (origin, dest) in [(n0, n4), (n3, n1), (n4, n0), (n2, n3)] {
            let r = find_best_route(&net, net.node_pos(origin), &[net.node_pos(dest)]);
            let route = r.route().unwrap();
            assert_abs_diff_eq!(route.distance_m, route.edge_length_sum(&net), epsilon = 1e-9);
            assert_eq!(route.nodes.len(), route.edges.len() + 1);
            for (i, &e) in route.edges.iter().enumerate() {
                assert_eq!(net.edge_endpoints(e), (route.nodes[i], route.nodes[i + 1]));
                assert!(net.is_open(e));
            }
        }

        let e = net.edges_between(n1, n2).next().unwrap();
        net.block_edge(e).unwrap();
        let r = find_best_route(&net, net.node_pos(n0), &[net.node_pos(n4)]);
        let route = r.route().unwrap();
        assert!(!route.edges.contains(&e));
        assert_abs_diff_eq!(route.distance_m, route.edge_length_sum(&net), epsilon = 1e-9);
    }

    #[test]
    fn origin_at_shelter_is_trivial() {
        let (net, [n0, ..]) = grid_network();
        let r = find_best_route(&net, net.node_pos(n0), &[net.node_pos(n0)]);
        let route = r.route().unwrap();
        assert!(route.is_trivial());
        assert_eq!(route.distance_m, 0.0);
        assert_eq!(route.coordinates, vec![net.node_pos(n0)]);
        assert_eq!(route.geometry(&net), vec![net.node_pos(n0)]);
    }

    #[test]
    fn empty_network_reports_origin_not_found() {
        let net = RoadNetworkBuilder::new().build();
        let origin = GeoPoint::new(13.06, 80.25);
        let r = find_best_route(&net, origin, &[GeoPoint::new(13.08, 80.27)]);
        assert_eq!(r, RouteResult::Failure(RouteFailure::OriginNotFound(origin)));
    }

    #[test]
    fn snap_radius_filters_destinations() {
        let (net, [_, _, _, _, n4]) = grid_network();
        let far = GeoPoint::new(14.0, 80.0);

        let r = find_best_route_with(&DijkstraRouter, &net, at(0.0, 0.0), &[far], Some(500.0));
        assert_eq!(r, RouteResult::Failure(RouteFailure::NoDestinationMatched));

        let r = find_best_route_with(
            &DijkstraRouter,
            &net,
            at(0.0, 0.0),
            &[far, net.node_pos(n4)],
            Some(500.0),
        );
        assert_eq!(r.route().unwrap().destination_index, 1);

        let r = find_best_route_with(&DijkstraRouter, &net, far, &[net.node_pos(n4)], Some(500.0));
        assert!(matches!(r, RouteResult::Failure(RouteFailure::OriginNotFound(_))));
    }

    #[test]
    fn non_finite_origin_is_not_found() {
        let (net, _) = grid_network();
        let origin = GeoPoint::new(f64::NAN, 80.0);
        let r = find_best_route(&net, origin, &[at(1.0, 2.0)]);
        assert!(matches!(r, RouteResult::Failure(RouteFailure::OriginNotFound(_))));
    }

    #[test]
    fn non_finite_destination_is_skipped() {
        let (net, [n0, .., n4]) = grid_network();
        let bad = GeoPoint::new(f64::NAN, f64::NAN);

        let r = find_best_route(&net, net.node_pos(n0), &[bad]);
        assert_eq!(r, RouteResult::Failure(RouteFailure::NoDestinationMatched));

        let r = find_best_route(&net, net.node_pos(n0), &[bad, net.node_pos(n4)]);
        let route = r.route().unwrap();
        assert_eq!(route.destination_index, 1);
        assert_eq!(route.distance_m, 300.0);
    }

    #[test]
    fn default_snap_radius_rejects_other_continents() {
        let (net, [n0, .., n4]) = grid_network();
        let elsewhere = GeoPoint::new(-45.0, -120.0);

        let r = find_best_route(&net, elsewhere, &[net.node_pos(n4)]);
        assert_eq!(r, RouteResult::Failure(RouteFailure::OriginNotFound(elsewhere)));

        let r = find_best_route(&net, net.node_pos(n0), &[elsewhere]);
        assert_eq!(r, RouteResult::Failure(RouteFailure::NoDestinationMatched));

        // Without a radius the nearest node is always taken.
        let r = find_best_route_with(&DijkstraRouter, &net, elsewhere, &[net.node_pos(n4)], None);
        assert!(r.is_success());
    }

    #[test]
    fn geometry_follows_edge_shapes() {
        let mut b = RoadNetworkBuilder::new();
        let a = b.add_node(at(0.0, 0.0));
        let c = b.add_node(at(1.0, 1.0));
        let d = b.add_node(at(1.0, 2.0));
        b.add_edge_with_geometry(a, c, &[at(0.0, 0.0), at(0.0, 1.0), at(1.0, 1.0)], None)
            .unwrap();
        b.add_edge(c, d, 111.0).unwrap();
        let net = b.build();

        let r = find_best_route(&net, at(0.0, 0.0), &[at(1.0, 2.0)]);
        let route = r.route().unwrap();
        assert_eq!(route.coordinates.len(), 3);
        assert_eq!(
            route.geometry(&net),
            vec![at(0.0, 0.0), at(0.0, 1.0), at(1.0, 1.0), at(1.0, 2.0)]
        );
    }

    #[test]
    fn into_result_conversion() {
        let (net, [a, _, c]) = line_network();
        let ok = find_best_route(&net, net.node_pos(a), &[net.node_pos(c)]);
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());

        let fail: RouteResult = RouteFailure::NoRouteFound.into();
        assert!(!fail.is_success());
        assert_eq!(fail.into_result().unwrap_err(), RouteFailure::NoRouteFound);
    }
}
