//! Built-in demo road network.
//!
//! A 6-node synthetic grid loosely following central Chennai, used when no
//! `--roads` file is given.  Two shelters sit at opposite corners so a
//! flood buffer around the middle of the grid visibly changes the answer.

use er_core::GeoPoint;
use er_service::Shelter;
use er_spatial::{RoadNetwork, RoadNetworkBuilder, SpatialResult};

/// Build the demo network and its shelters.
///
/// ```text
///   egmore ───── park_town ───── fort
///     │              │             │
///   chetpet ──── nungambakkam ── triplicane
/// ```
pub fn build_network() -> SpatialResult<(RoadNetwork, Vec<Shelter>)> {
    let mut b = RoadNetworkBuilder::new();

    let egmore       = b.add_node(GeoPoint::new(13.0780, 80.2610));
    let park_town    = b.add_node(GeoPoint::new(13.0800, 80.2700));
    let fort         = b.add_node(GeoPoint::new(13.0810, 80.2870));
    let chetpet      = b.add_node(GeoPoint::new(13.0700, 80.2410));
    let nungambakkam = b.add_node(GeoPoint::new(13.0600, 80.2500));
    let triplicane   = b.add_node(GeoPoint::new(13.0580, 80.2780));

    // Lengths derived from straight-line geometry.
    for (a, z) in [
        (egmore, park_town),
        (park_town, fort),
        (chetpet, nungambakkam),
        (nungambakkam, triplicane),
        (egmore, chetpet),
        (park_town, nungambakkam),
        (fort, triplicane),
    ] {
        let shape = [b.node_pos(a), b.node_pos(z)];
        b.add_road_with_geometry(a, z, &shape, None)?;
    }

    let shelters = vec![
        Shelter::named("Fort St. George", 13.0810, 80.2870),
        Shelter::named("Chetpet Grounds", 13.0700, 80.2410),
    ];
    Ok((b.build(), shelters))
}
