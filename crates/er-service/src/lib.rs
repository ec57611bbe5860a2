//! `er-service` — routing façade, snapshot publishing, and data ingestion.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                        |
//! |--------------|-----------------------------------------------------------------|
//! | [`service`]  | `RoutingService`, `RoutingSnapshot`                             |
//! | [`config`]   | `ServiceConfig`, `Shelter`                                      |
//! | [`loader`]   | GeoJSON roads (read/write) / flood, CSV shelters, sources       |
//! | [`response`] | `RouteResponse` (JSON wire shape)                               |
//! | [`error`]    | `ServiceError`, `ServiceResult<T>`                              |
//!
//! # Feature flags
//!
//! | Flag       | Effect                                            |
//! |------------|---------------------------------------------------|
//! | `parallel` | Runs flood passes on Rayon (`er-spatial/parallel`). |

pub mod config;
pub mod error;
pub mod loader;
pub mod response;
pub mod service;


pub use config::{DEFAULT_MAX_SNAP_DISTANCE_M, ServiceConfig, Shelter};
pub use error::{ServiceError, ServiceResult};
pub use loader::{
    FloodSource, GeoJsonFile, IngestReport, RoadSource, load_flood_geojson, load_roads_geojson,
    load_shelters_csv, load_shelters_reader, write_roads_geojson,
};
pub use response::RouteResponse;
pub use service::{RoutingService, RoutingSnapshot};
