//! Spatial-subsystem error type.

use thiserror::Error;

use er_core::{EdgeId, GeoPoint, NodeId};

/// Errors produced by `er-spatial`.
///
/// "No route" during multi-target routing is *not* reported here; it is a
/// [`RouteFailure`](crate::RouteFailure) value.  [`SpatialError::NoRoute`]
/// is only returned by the single-pair [`Router::route`](crate::Router::route)
/// helper.
#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: NodeId, to: NodeId },

    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("edge {0} not found in network")]
    EdgeNotFound(EdgeId),

    #[error("edge {from} -> {to} has invalid length {length_m}")]
    InvalidLength { from: NodeId, to: NodeId, length_m: f64 },

    #[error("no road node near {pos}")]
    NoNearbyNode { pos: GeoPoint },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
