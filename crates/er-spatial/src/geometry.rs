//! Geometry utilities: polylines, flood polygons, and the intersection
//! predicate used by the flood pass.
//!
//! # Coordinate convention
//!
//! All `geo` geometries in this crate are in WGS-84 degrees with
//! `x = lon, y = lat` (GeoJSON axis order).  Road polylines and flood
//! polygons share that plane, so the predicate compares like with like.
//! Metric inputs (buffer radii) are converted through
//! [`LocalProjection`] before they touch a polygon.

use geo::{BoundingRect, Coord, Intersects, LineString, Polygon, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use er_core::{GeoPoint, LocalProjection};

/// Bounding box of one flood polygon, tagged with its position in
/// `FloodRegion::polygons`.
type PolygonEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

// ── Conversions ───────────────────────────────────────────────────────────────

#[inline]
pub fn coord(p: GeoPoint) -> Coord<f64> {
    Coord { x: p.lon, y: p.lat }
}

/// Build a `geo` polyline from an ordered coordinate sequence.
pub fn line_string(points: &[GeoPoint]) -> LineString<f64> {
    LineString::new(points.iter().copied().map(coord).collect())
}

/// Build a polygon from an exterior ring.  The ring is closed automatically.
pub fn polygon_from_ring(ring: &[GeoPoint]) -> Polygon<f64> {
    Polygon::new(line_string(ring), vec![])
}

/// Haversine length of a polyline in metres.  Fewer than two points → 0.
pub fn polyline_length_m(points: &[GeoPoint]) -> f64 {
    points.windows(2).map(|w| w[0].distance_m(w[1])).sum()
}

/// Same as [`polyline_length_m`] for a `geo` polyline in lon/lat order.
pub fn line_length_m(line: &LineString<f64>) -> f64 {
    line.0
        .windows(2)
        .map(|w| GeoPoint::new(w[0].y, w[0].x).distance_m(GeoPoint::new(w[1].y, w[1].x)))
        .sum()
}

#[inline]
pub(crate) fn envelope(rect: Rect<f64>) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y])
}

// ── FloodRegion ───────────────────────────────────────────────────────────────

/// Immutable snapshot of the flooded area: a set of polygons plus an R-tree
/// over their bounding boxes.
///
/// The region is treated as the union of its polygons.  Overlapping polygons
/// are fine; nothing is dissolved.
#[derive(Clone, Debug, Default)]
pub struct FloodRegion {
    polygons: Vec<Polygon<f64>>,
    index: RTree<PolygonEnvelope>,
}

impl FloodRegion {
    /// A region that floods nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index `polygons`.  Polygons with an empty exterior ring are dropped.
    pub fn from_polygons(polygons: impl IntoIterator<Item = Polygon<f64>>) -> Self {
        let mut kept = Vec::new();
        let mut entries = Vec::new();
        for poly in polygons {
            let Some(rect) = poly.bounding_rect() else {
                tracing::debug!("dropping flood polygon with empty exterior");
                continue;
            };
            entries.push(GeomWithData::new(
                Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                kept.len(),
            ));
            kept.push(poly);
        }
        Self { polygons: kept, index: RTree::bulk_load(entries) }
    }

    /// Circular flood zone of `radius_m` metres around `center`, approximated
    /// by a regular polygon with `segments` vertices (at least 8).
    ///
    /// The circle is laid out in a local metric frame and converted back to
    /// degrees, so the radius is a true ground distance.
    pub fn buffer(center: GeoPoint, radius_m: f64, segments: usize) -> Self {
        if !(radius_m.is_finite() && radius_m > 0.0) {
            return Self::empty();
        }
        let segments = segments.max(8);
        let proj = LocalProjection::new(center);
        let ring: Vec<GeoPoint> = (0..segments)
            .map(|i| {
                let theta = std::f64::consts::TAU * i as f64 / segments as f64;
                proj.unproject([radius_m * theta.cos(), radius_m * theta.sin()])
            })
            .collect();
        Self::from_polygons([polygon_from_ring(&ring)])
    }

    /// Union of two regions (polygons concatenated, index rebuilt).
    pub fn merge(self, other: FloodRegion) -> Self {
        Self::from_polygons(self.polygons.into_iter().chain(other.polygons))
    }

    pub fn polygons(&self) -> &[Polygon<f64>] {
        &self.polygons
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Bounding box of the whole region, `None` when empty.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.polygons
            .iter()
            .filter_map(|p| p.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }

    /// Polygons whose bounding box meets `rect`.
    pub(crate) fn candidates(&self, rect: Rect<f64>) -> impl Iterator<Item = &Polygon<f64>> + '_ {
        self.index
            .locate_in_envelope_intersecting(&envelope(rect))
            .map(|entry| &self.polygons[entry.data])
    }

    /// `true` iff `line` touches the boundary or interior of any polygon.
    pub fn intersects(&self, line: &LineString<f64>) -> bool {
        let Some(rect) = line.bounding_rect() else {
            return false;
        };
        self.candidates(rect).any(|poly| line.intersects(poly))
    }
}

/// Intersection predicate between an edge polyline and a flood region.
///
/// Empty geometry and empty regions never intersect.
pub fn intersects(edge_geometry: &LineString<f64>, region: &FloodRegion) -> bool {
    region.intersects(edge_geometry)
}
