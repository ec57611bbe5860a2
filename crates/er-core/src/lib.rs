//! `er-core` — foundational types for the `evac_route` routing engine.
//!
//! This crate is a dependency of every other `er-*` crate.  It intentionally
//! has no `er-*` dependencies and minimal external ones (only `thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                              |
//! |-----------|-------------------------------------------------------|
//! | [`ids`]   | `NodeId`, `EdgeId`                                    |
//! | [`geo`]   | `GeoPoint`, haversine distance, `LocalProjection`     |
//! | [`error`] | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::{EARTH_RADIUS_M, GeoPoint, LocalProjection};
pub use ids::{EdgeId, NodeId};
