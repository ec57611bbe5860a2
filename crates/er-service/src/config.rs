//! Service configuration.
//!
//! Typically loaded from a JSON file by the application and passed to
//! [`RoutingService::new`](crate::RoutingService::new):
//!
//! ```json
//! {
//!   "shelters": [
//!     { "name": "Central", "lat": 13.0827, "lon": 80.2707 },
//!     { "lat": 13.0674, "lon": 80.2376 }
//!   ],
//!   "max_snap_distance_m": 5000
//! }
//! ```

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use er_core::{CoreResult, GeoPoint};

use crate::{ServiceError, ServiceResult};

/// Default snapping radius: a request more than 10 km from any road node is
/// treated as outside the network.
pub const DEFAULT_MAX_SNAP_DISTANCE_M: f64 = er_spatial::DEFAULT_SNAP_RADIUS_M;

fn default_max_snap_distance_m() -> f64 {
    DEFAULT_MAX_SNAP_DISTANCE_M
}

/// A fixed evacuation destination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shelter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Shelter {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { name: None, lat, lon }
    }

    pub fn named(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self { name: Some(name.into()), lat, lon }
    }

    #[inline]
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// [`position`](Self::position), rejecting out-of-range coordinates.
    pub fn try_position(&self) -> CoreResult<GeoPoint> {
        GeoPoint::try_new(self.lat, self.lon)
    }
}

/// Static routing configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Candidate destinations, in tie-break order (lower index wins).
    pub shelters: Vec<Shelter>,

    /// Maximum distance in metres between a coordinate and the road node it
    /// snaps to.  Applies to request origins and to shelters.
    #[serde(default = "default_max_snap_distance_m")]
    pub max_snap_distance_m: f64,
}

impl ServiceConfig {
    pub fn new(shelters: Vec<Shelter>) -> Self {
        Self { shelters, max_snap_distance_m: DEFAULT_MAX_SNAP_DISTANCE_M }
    }

    pub fn with_max_snap_distance_m(mut self, metres: f64) -> Self {
        self.max_snap_distance_m = metres;
        self
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_reader<R: Read>(reader: R) -> ServiceResult<Self> {
        let config: ServiceConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> ServiceResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    /// At least one shelter, every shelter a valid coordinate, and a
    /// positive finite snapping radius.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.shelters.is_empty() {
            return Err(ServiceError::Config("at least one shelter is required".into()));
        }
        for s in &self.shelters {
            s.try_position()?;
        }
        if !(self.max_snap_distance_m.is_finite() && self.max_snap_distance_m > 0.0) {
            return Err(ServiceError::Config(format!(
                "max_snap_distance_m must be positive, got {}",
                self.max_snap_distance_m
            )));
        }
        Ok(())
    }

    pub fn shelter_positions(&self) -> Vec<GeoPoint> {
        self.shelters.iter().map(Shelter::position).collect()
    }
}
