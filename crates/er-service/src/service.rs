//! `RoutingService` — the request-facing façade.
//!
//! # Snapshots
//!
//! Every request runs against one immutable [`RoutingSnapshot`]: a road
//! network with the current flood already applied.  Writers (flood refresh,
//! network rebuild) build the next snapshot off to the side and publish it
//! with a single pointer swap, so a request in flight never observes a
//! half-applied flood pass and readers never wait on a writer's work.
//!
//! ```text
//!   baseline (all edges Open) ──clone──► apply_flood_blocking ──► snapshot vN+1
//!                                                                      │
//!   requests ──► active.read().clone() ◄──────────── swap ─────────────┘
//! ```
//!
//! A failed load logs a warning and leaves the active snapshot untouched.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use er_core::{EdgeId, GeoPoint};
use er_spatial::{
    DijkstraRouter, FloodRegion, RoadNetwork, RouteFailure, RouteResult, apply_flood_blocking,
    find_best_route_with,
};

use crate::config::ServiceConfig;
use crate::loader::{FloodSource, RoadSource};
use crate::response::RouteResponse;
use crate::{ServiceError, ServiceResult};

// ── RoutingSnapshot ───────────────────────────────────────────────────────────

/// One published, immutable routing state.
#[derive(Debug)]
pub struct RoutingSnapshot {
    /// Network with `flood` applied.  This is what requests route on.
    pub network:  Arc<RoadNetwork>,
    /// The network as loaded, before `flood`.  Flood passes start from here
    /// so a receding flood reopens roads; edges loaded as blocked stay blocked.
    pub baseline: Arc<RoadNetwork>,
    /// Flood region applied to `network`.
    pub flood:    Arc<FloodRegion>,
    /// Edges blocked by `flood`, ascending.
    pub blocked:  Vec<EdgeId>,
    /// Incremented on every publish, starting at 0.
    pub version:  u64,
}

impl RoutingSnapshot {
    fn build(baseline: Arc<RoadNetwork>, flood: Arc<FloodRegion>, version: u64) -> Self {
        let mut network = RoadNetwork::clone(&baseline);
        let blocked = if flood.is_empty() {
            Vec::new()
        } else {
            apply_flood_blocking(&mut network, &flood)
        };
        Self { network: Arc::new(network), baseline, flood, blocked, version }
    }
}

// ── RoutingService ────────────────────────────────────────────────────────────

/// Answers "where is the nearest reachable shelter" for a coordinate.
///
/// `Send + Sync`; share it behind an `Arc` and call [`route`](Self::route)
/// from any number of threads.
pub struct RoutingService {
    config: ServiceConfig,
    router: DijkstraRouter,
    active: RwLock<Arc<RoutingSnapshot>>,
    /// Serialises writers; readers never take it.
    writer: Mutex<()>,
}

impl RoutingService {
    /// Validate `config` and publish `network` as version 0 with no flood.
    pub fn new(config: ServiceConfig, network: RoadNetwork) -> ServiceResult<Self> {
        config.validate()?;
        if network.is_empty() {
            return Err(ServiceError::Config("road network has no nodes".into()));
        }
        info!(
            nodes = network.node_count(),
            edges = network.edge_count(),
            shelters = config.shelters.len(),
            "routing service ready"
        );
        let snapshot =
            RoutingSnapshot::build(Arc::new(network), Arc::new(FloodRegion::empty()), 0);
        Ok(Self {
            config,
            router: DijkstraRouter,
            active: RwLock::new(Arc::new(snapshot)),
            writer: Mutex::new(()),
        })
    }

    /// Load roads (and optionally a flood) from sources, then publish.
    ///
    /// Unlike [`rebuild`](Self::rebuild) there is no previous state to fall
    /// back on, so a load failure is returned as `DataUnavailable`.
    pub fn from_sources(
        config: ServiceConfig,
        roads:  &dyn RoadSource,
        flood:  Option<&dyn FloodSource>,
    ) -> ServiceResult<Self> {
        let network = roads
            .load_roads()
            .map_err(|e| ServiceError::unavailable(roads.describe(), e))?;
        let service = Self::new(config, network)?;
        if let Some(src) = flood {
            let region = src
                .load_flood()
                .map_err(|e| ServiceError::unavailable(src.describe(), e))?;
            service.apply_flood(region);
        }
        Ok(service)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The currently published snapshot.  Holding it keeps that version
    /// alive even after a newer one is published.
    pub fn snapshot(&self) -> Arc<RoutingSnapshot> {
        Arc::clone(&self.active.read())
    }

    pub fn version(&self) -> u64 {
        self.active.read().version
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    /// Route from `origin` to the nearest reachable shelter.
    pub fn route(&self, origin: GeoPoint) -> RouteResult {
        let snapshot = self.snapshot();
        self.route_on(&snapshot, origin)
    }

    /// Route on a specific snapshot, e.g. one held across several requests.
    pub fn route_on(&self, snapshot: &RoutingSnapshot, origin: GeoPoint) -> RouteResult {
        if !origin.is_valid() {
            return RouteFailure::OriginNotFound(origin).into();
        }
        find_best_route_with(
            &self.router,
            &snapshot.network,
            origin,
            &self.config.shelter_positions(),
            Some(self.config.max_snap_distance_m),
        )
    }

    /// Request/response entry point: raw coordinates in, wire response out.
    pub fn respond(&self, lat: f64, lon: f64) -> RouteResponse {
        match GeoPoint::try_new(lat, lon) {
            Ok(origin) => RouteResponse::from(&self.route(origin)),
            Err(e) => RouteResponse::fail(e.to_string()),
        }
    }

    // ── Writers ───────────────────────────────────────────────────────────────

    /// Replace the active flood with `region` and publish.  Returns the
    /// edges blocked in the new snapshot.
    pub fn apply_flood(&self, region: FloodRegion) -> Vec<EdgeId> {
        let _guard = self.writer.lock();
        let current = self.snapshot();
        let next = RoutingSnapshot::build(
            Arc::clone(&current.baseline),
            Arc::new(region),
            current.version + 1,
        );
        let blocked = next.blocked.clone();
        self.publish(next);
        blocked
    }

    /// Reload flood data from `source`.  On failure the active snapshot is
    /// kept and the error returned.
    pub fn refresh_flood(&self, source: &dyn FloodSource) -> ServiceResult<Vec<EdgeId>> {
        match source.load_flood() {
            Ok(region) => Ok(self.apply_flood(region)),
            Err(e) => {
                warn!(source = %source.describe(), error = %e, "flood refresh failed, keeping current snapshot");
                Err(ServiceError::unavailable(source.describe(), e))
            }
        }
    }

    /// Reload the road network from `source` and re-apply the active flood.
    /// On failure the active snapshot is kept and the error returned.
    pub fn rebuild(&self, source: &dyn RoadSource) -> ServiceResult<u64> {
        let network = match source.load_roads() {
            Ok(n) if !n.is_empty() => n,
            Ok(_) => {
                warn!(source = %source.describe(), "rebuild produced an empty network, keeping current snapshot");
                return Err(ServiceError::unavailable(source.describe(), "empty road network"));
            }
            Err(e) => {
                warn!(source = %source.describe(), error = %e, "rebuild failed, keeping current snapshot");
                return Err(ServiceError::unavailable(source.describe(), e));
            }
        };

        let _guard = self.writer.lock();
        let current = self.snapshot();
        let next = RoutingSnapshot::build(
            Arc::new(network),
            Arc::clone(&current.flood),
            current.version + 1,
        );
        let version = next.version;
        self.publish(next);
        Ok(version)
    }

    /// Caller holds `writer`.
    fn publish(&self, next: RoutingSnapshot) {
        info!(
            version = next.version,
            blocked = next.blocked.len(),
            polygons = next.flood.polygon_count(),
            "publishing routing snapshot"
        );
        *self.active.write() = Arc::new(next);
    }
}
