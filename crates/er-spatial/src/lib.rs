//! `er-spatial` — road network, flood blocking, and multi-target routing.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                       |
//! |--------------|----------------------------------------------------------------|
//! | [`geometry`] | `FloodRegion`, `intersects`, polyline helpers                  |
//! | [`network`]  | `RoadNetwork` (CSR + R-trees + edge status), `RoadNetworkBuilder` |
//! | [`flood`]    | `apply_flood_blocking`, `flooded_edges`                        |
//! | [`router`]   | `Router` trait, `ShortestPathTree`, `DijkstraRouter`           |
//! | [`resolver`] | `find_best_route`, `RouteResult`, `Route`, `RouteFailure`      |
//! | [`error`]    | `SpatialError`, `SpatialResult<T>`                             |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                     |
//! |------------|------------------------------------------------------------|
//! | `parallel` | Runs the flood pass's exact intersection tests on Rayon.   |
//! | `serde`    | Derives `Serialize`/`Deserialize` on public types.         |

pub mod error;
pub mod flood;
pub mod geometry;
pub mod network;
pub mod resolver;
pub mod router;

#[cfg(test)]
mod tests;

pub use error::{SpatialError, SpatialResult};
pub use flood::{apply_flood_blocking, flooded_edges};
pub use geometry::{FloodRegion, intersects, line_string, polygon_from_ring, polyline_length_m};
pub use network::{EdgeStatus, RoadNetwork, RoadNetworkBuilder};
pub use resolver::{
    DEFAULT_SNAP_RADIUS_M, Route, RouteFailure, RouteResult, find_best_route, find_best_route_with,
};
pub use router::{DijkstraRouter, Path, Router, ShortestPathTree};
