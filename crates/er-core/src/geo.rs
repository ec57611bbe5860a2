//! Geographic coordinate type and a local metric projection.
//!
//! Road and flood geometry arrive as WGS-84 latitude/longitude.  Anything
//! that compares a distance in metres (nearest-node snapping, buffer radii)
//! must first go through [`LocalProjection`] so degrees and metres are never
//! mixed in the same computation.

use crate::{CoreError, CoreResult};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A WGS-84 geographic coordinate.
///
/// Double precision: the flood pass intersects road polylines with polygon
/// rings, and `f32` degrees lose sub-metre detail at city scale.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Construct a point, rejecting non-finite or out-of-range values.
    pub fn try_new(lat: f64, lon: f64) -> CoreResult<Self> {
        let p = Self { lat, lon };
        if p.is_valid() {
            Ok(p)
        } else {
            Err(CoreError::InvalidCoordinate { lat, lon })
        }
    }

    /// `true` if both components are finite and inside the WGS-84 range.
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Haversine great-circle distance in metres.
    pub fn distance_m(self, other: GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }

    /// `[lon, lat]` — the axis order used by GeoJSON and the `geo` crate.
    #[inline]
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// `[lat, lon]` — the axis order of the routing response.
    #[inline]
    pub fn to_lat_lon(self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

// ── LocalProjection ───────────────────────────────────────────────────────────

/// Equirectangular projection anchored at a reference point.
///
/// Maps a coordinate to `[east_m, north_m]` relative to the anchor.  Error
/// stays well under 1 % within a few tens of kilometres of the anchor, which
/// covers a city road network; it is not meant for continental extents.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalProjection {
    origin: GeoPoint,
    m_per_deg_lat: f64,
    m_per_deg_lon: f64,
}

impl LocalProjection {
    pub fn new(origin: GeoPoint) -> Self {
        let m_per_deg_lat = EARTH_RADIUS_M.to_radians();
        // Clamp keeps the scale non-zero for anchors at the poles.
        let m_per_deg_lon = m_per_deg_lat * origin.lat.to_radians().cos().max(1e-6);
        Self { origin, m_per_deg_lat, m_per_deg_lon }
    }

    /// Anchor at the arithmetic mean of `points`, or at (0, 0) when empty.
    pub fn centered_on<I>(points: I) -> Self
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let (mut lat, mut lon, mut n) = (0.0, 0.0, 0usize);
        for p in points {
            lat += p.lat;
            lon += p.lon;
            n += 1;
        }
        if n == 0 {
            return Self::new(GeoPoint::new(0.0, 0.0));
        }
        Self::new(GeoPoint::new(lat / n as f64, lon / n as f64))
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    /// Degrees → local `[east_m, north_m]`.
    #[inline]
    pub fn project(&self, p: GeoPoint) -> [f64; 2] {
        [
            (p.lon - self.origin.lon) * self.m_per_deg_lon,
            (p.lat - self.origin.lat) * self.m_per_deg_lat,
        ]
    }

    /// Local `[east_m, north_m]` → degrees.
    #[inline]
    pub fn unproject(&self, xy: [f64; 2]) -> GeoPoint {
        GeoPoint::new(
            self.origin.lat + xy[1] / self.m_per_deg_lat,
            self.origin.lon + xy[0] / self.m_per_deg_lon,
        )
    }
}
