//! Wire shape of a routing response.
//!
//! ```json
//! {"status":"success","distance_meters":812.47,"route":[[13.0604,80.2496],[13.0611,80.251]]}
//! {"status":"fail","message":"No safe route found"}
//! ```

use serde::{Deserialize, Serialize};

use er_spatial::RouteResult;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RouteResponse {
    Success {
        /// Metres, rounded to two decimals.
        distance_meters: f64,
        /// `[lat, lon]` pairs from the snapped origin to the shelter.
        route: Vec<[f64; 2]>,
    },
    Fail {
        message: String,
    },
}

impl RouteResponse {
    pub fn fail(message: impl Into<String>) -> Self {
        RouteResponse::Fail { message: message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RouteResponse::Success { .. })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn round_2dp(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl From<&RouteResult> for RouteResponse {
    fn from(result: &RouteResult) -> Self {
        match result {
            RouteResult::Success(route) => RouteResponse::Success {
                distance_meters: round_2dp(route.distance_m),
                route: route.coordinates.iter().map(|p| p.to_lat_lon()).collect(),
            },
            RouteResult::Failure(failure) => RouteResponse::fail(failure.reason()),
        }
    }
}
