//! Ingestion adapters: GeoJSON roads, GeoJSON flood polygons, CSV shelters.
//!
//! # Roads
//!
//! A FeatureCollection of `LineString` / `MultiLineString` features, one
//! per road segment, coordinates in `[lon, lat]` order:
//!
//! ```json
//! { "type": "Feature",
//!   "properties": { "length": 412.7, "oneway": false },
//!   "geometry": { "type": "LineString",
//!                 "coordinates": [[80.2496, 13.0604], [80.2510, 13.0611]] } }
//! ```
//!
//! | Property | Meaning                                                     |
//! |----------|-------------------------------------------------------------|
//! | `length` | metres; absent → haversine length of the geometry           |
//! | `oneway` | `true` / `"yes"` / `"1"` → one directed edge, else two      |
//! | `status` | `"blocked"` → the feature's edges start blocked; `"safe"` / absent → open |
//!
//! Segments sharing an exact endpoint coordinate share a node.  A
//! `MultiLineString` contributes one segment per part and ignores `length`.
//!
//! [`write_roads_geojson`] writes the same format back out, one `oneway`
//! feature per directed edge with its current `status`, so a blocked view
//! survives a write/load round trip.
//!
//! # Flood polygons
//!
//! `Polygon` / `MultiPolygon` features in the same reference as the roads.
//!
//! # Malformed records
//!
//! A feature that cannot be used (no geometry, wrong geometry type, fewer
//! than two positions, coordinates out of range, bad length or status) is
//! skipped with a `warn` event and counted in [`IngestReport::skipped`].
//! Only a document that is not GeoJSON at all, or yields nothing usable,
//! fails the load.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use geo::{Geometry, LineString, Polygon};
use geojson::{GeoJson, JsonObject, JsonValue, Value as GeoJsonValue};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use er_core::{EdgeId, GeoPoint, NodeId};
use er_spatial::{EdgeStatus, FloodRegion, RoadNetwork, RoadNetworkBuilder};

use crate::config::Shelter;
use crate::{ServiceError, ServiceResult};

// ── Report ────────────────────────────────────────────────────────────────────

/// Counts from one ingestion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Records turned into roads / polygons / shelters.
    pub loaded: usize,
    /// Records skipped as malformed.
    pub skipped: usize,
    /// Edges loaded with `status: "blocked"`.
    pub blocked: usize,
}

// ── Sources ───────────────────────────────────────────────────────────────────

/// Where road data comes from.  Consumed once per (re)build.
pub trait RoadSource: Send + Sync {
    /// Short label for logs and errors.
    fn describe(&self) -> String;

    fn load_roads(&self) -> ServiceResult<RoadNetwork>;
}

/// Where flood polygons come from.  Consumed once per blocking pass.
pub trait FloodSource: Send + Sync {
    fn describe(&self) -> String;

    fn load_flood(&self) -> ServiceResult<FloodRegion>;
}

/// A GeoJSON file usable as either source.
#[derive(Clone, Debug)]
pub struct GeoJsonFile {
    path: PathBuf,
}

impl GeoJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> ServiceResult<std::io::BufReader<std::fs::File>> {
        Ok(std::io::BufReader::new(std::fs::File::open(&self.path)?))
    }
}

impl RoadSource for GeoJsonFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load_roads(&self) -> ServiceResult<RoadNetwork> {
        let (network, _) = load_roads_geojson(self.open()?)?;
        Ok(network)
    }
}

impl FloodSource for GeoJsonFile {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load_flood(&self) -> ServiceResult<FloodRegion> {
        let (region, _) = load_flood_geojson(self.open()?)?;
        Ok(region)
    }
}

/// An already-built network serves as its own source.
impl RoadSource for RoadNetwork {
    fn describe(&self) -> String {
        format!("in-memory network ({} nodes)", self.node_count())
    }

    fn load_roads(&self) -> ServiceResult<RoadNetwork> {
        Ok(self.clone())
    }
}

impl FloodSource for FloodRegion {
    fn describe(&self) -> String {
        format!("in-memory flood region ({} polygons)", self.polygon_count())
    }

    fn load_flood(&self) -> ServiceResult<FloodRegion> {
        Ok(self.clone())
    }
}

// ── GeoJSON plumbing ──────────────────────────────────────────────────────────

/// One feature's geometry and properties, in document order.
struct Record {
    geometry:   Option<geojson::Geometry>,
    properties: Option<JsonObject>,
}

fn read_records<R: Read>(mut reader: R) -> ServiceResult<Vec<Record>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let doc: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| ServiceError::MalformedInput(e.to_string()))?;

    Ok(match doc {
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .map(|f| Record { geometry: f.geometry, properties: f.properties })
            .collect(),
        GeoJson::Feature(f) => vec![Record { geometry: f.geometry, properties: f.properties }],
        GeoJson::Geometry(g) => vec![Record { geometry: Some(g), properties: None }],
    })
}

fn to_geo(geometry: Option<geojson::Geometry>) -> Result<Geometry<f64>, String> {
    let geometry = geometry.ok_or("missing geometry")?;
    Geometry::<f64>::try_from(geometry).map_err(|e| e.to_string())
}

/// `[lon, lat]` positions → validated points.
fn line_points(line: &LineString<f64>) -> Result<Vec<GeoPoint>, String> {
    if line.0.len() < 2 {
        return Err(format!("{} position(s), need at least 2", line.0.len()));
    }
    line.coords()
        .map(|c| {
            GeoPoint::try_new(c.y, c.x).map_err(|e| e.to_string())
        })
        .collect()
}

fn parse_oneway(props: Option<&JsonObject>) -> bool {
    match props.and_then(|p| p.get("oneway")) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => matches!(s.trim(), "yes" | "true" | "1"),
        Some(JsonValue::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// `Ok(true)` for a blocked road.
fn parse_blocked(props: Option<&JsonObject>) -> Result<bool, String> {
    match props.and_then(|p| p.get("status")) {
        None | Some(JsonValue::Null) => Ok(false),
        Some(JsonValue::String(s)) => match s.trim() {
            "blocked" => Ok(true),
            "safe" | "open" => Ok(false),
            other => Err(format!("unknown status {other:?}")),
        },
        Some(v) => Err(format!("status {v} is not a string")),
    }
}

fn parse_length(props: Option<&JsonObject>) -> Result<Option<f64>, String> {
    match props.and_then(|p| p.get("length")) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("length {v} is not a number")),
    }
}

// ── Roads ─────────────────────────────────────────────────────────────────────

/// Build a [`RoadNetwork`] from a GeoJSON road document.
pub fn load_roads_geojson<R: Read>(reader: R) -> ServiceResult<(RoadNetwork, IngestReport)> {
    let records = read_records(reader)?;

    let mut builder = RoadNetworkBuilder::with_capacity(records.len() * 2, records.len() * 2);
    let mut node_of: FxHashMap<(u64, u64), NodeId> = FxHashMap::default();
    let mut report = IngestReport::default();
    // Builder insertion indices of edges to block once ids are final.
    let mut blocked_inserts: Vec<usize> = Vec::new();

    for (i, rec) in records.into_iter().enumerate() {
        match add_road_record(&mut builder, &mut node_of, &mut blocked_inserts, rec) {
            Ok(()) => report.loaded += 1,
            Err(reason) => {
                warn!(feature = i, %reason, "skipping malformed road feature");
                report.skipped += 1;
            }
        }
    }

    if report.loaded == 0 {
        return Err(ServiceError::MalformedInput(format!(
            "no usable road features ({} skipped)",
            report.skipped
        )));
    }

    let (mut network, ids) = builder.build_indexed();
    for &k in &blocked_inserts {
        network.block_edge(ids[k])?;
    }
    report.blocked = blocked_inserts.len();

    info!(
        nodes = network.node_count(),
        edges = network.edge_count(),
        blocked = report.blocked,
        skipped = report.skipped,
        "road network loaded"
    );
    Ok((network, report))
}

fn add_road_record(
    builder: &mut RoadNetworkBuilder,
    node_of: &mut FxHashMap<(u64, u64), NodeId>,
    blocked: &mut Vec<usize>,
    rec:     Record,
) -> Result<(), String> {
    let props = rec.properties.as_ref();
    let oneway = parse_oneway(props);
    let length = parse_length(props)?;
    let is_blocked = parse_blocked(props)?;

    let (lines, length) = match to_geo(rec.geometry)? {
        Geometry::LineString(line) => (vec![line], length),
        Geometry::MultiLineString(multi) => (multi.0, None),
        other => return Err(format!("unsupported road geometry {}", geometry_name(&other))),
    };

    // Validate every part before touching the builder so a bad feature adds
    // nothing.
    let parts: Vec<Vec<GeoPoint>> = lines.iter().map(line_points).collect::<Result<_, _>>()?;
    if parts.is_empty() {
        return Err("empty MultiLineString".into());
    }
    if let Some(l) = length {
        if !(l.is_finite() && l >= 0.0) {
            return Err(format!("invalid length {l}"));
        }
    }

    let first_edge = builder.edge_count();
    for points in parts {
        let from = node_for(builder, node_of, points[0]);
        let to = node_for(builder, node_of, points[points.len() - 1]);
        let added = if oneway {
            builder.add_edge_with_geometry(from, to, &points, length)
        } else {
            builder.add_road_with_geometry(from, to, &points, length)
        };
        added.map_err(|e| e.to_string())?;
    }
    if is_blocked {
        blocked.extend(first_edge..builder.edge_count());
    }
    Ok(())
}

/// Write every non-removed edge of `network` as a `oneway` LineString
/// feature carrying `length` and `status` (`"blocked"` or `"safe"`).
/// Returns the number of features written.
pub fn write_roads_geojson<W: Write>(network: &RoadNetwork, writer: W) -> ServiceResult<usize> {
    let features: Vec<JsonValue> = EdgeId::range(network.edge_count())
        .filter_map(|e| {
            let status = match network.edge_status(e).ok()? {
                EdgeStatus::Open => "safe",
                EdgeStatus::Blocked => "blocked",
                EdgeStatus::Removed => return None,
            };
            let geometry = geojson::Geometry::new(GeoJsonValue::from(network.edge_geometry(e)));
            Some(json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": {
                    "length": network.edge_length_m(e),
                    "oneway": true,
                    "status": status,
                }
            }))
        })
        .collect();

    let written = features.len();
    serde_json::to_writer(writer, &json!({ "type": "FeatureCollection", "features": features }))?;
    info!(features = written, "road network written");
    Ok(written)
}

fn node_for(
    builder: &mut RoadNetworkBuilder,
    node_of: &mut FxHashMap<(u64, u64), NodeId>,
    pos:     GeoPoint,
) -> NodeId {
    *node_of
        .entry((pos.lat.to_bits(), pos.lon.to_bits()))
        .or_insert_with(|| builder.add_node(pos))
}

// ── Flood polygons ────────────────────────────────────────────────────────────

/// Build a [`FloodRegion`] from a GeoJSON polygon document.
///
/// An empty collection is valid and yields an empty region.
pub fn load_flood_geojson<R: Read>(reader: R) -> ServiceResult<(FloodRegion, IngestReport)> {
    let records = read_records(reader)?;
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    let mut report = IngestReport::default();

    for (i, rec) in records.into_iter().enumerate() {
        let parsed = to_geo(rec.geometry).and_then(|g| match g {
            Geometry::Polygon(p) => Ok(vec![p]),
            Geometry::MultiPolygon(mp) => Ok(mp.0),
            other => Err(format!("unsupported flood geometry {}", geometry_name(&other))),
        });
        let parsed = parsed.and_then(|polys| {
            if polys.iter().all(|p| p.exterior().0.len() >= 4) {
                Ok(polys)
            } else {
                Err("polygon ring has fewer than 4 positions".to_string())
            }
        });
        match parsed {
            Ok(polys) => {
                polygons.extend(polys);
                report.loaded += 1;
            }
            Err(reason) => {
                warn!(feature = i, %reason, "skipping malformed flood feature");
                report.skipped += 1;
            }
        }
    }

    let region = FloodRegion::from_polygons(polygons);
    info!(polygons = region.polygon_count(), skipped = report.skipped, "flood region loaded");
    Ok((region, report))
}

fn geometry_name(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

// ── Shelters ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ShelterRecord {
    #[serde(default)]
    name: Option<String>,
    lat:  f64,
    lon:  f64,
}

/// Load shelters from a CSV file with header `name,lat,lon`.
pub fn load_shelters_csv(path: &Path) -> ServiceResult<Vec<Shelter>> {
    let file = std::fs::File::open(path)?;
    load_shelters_reader(file)
}

/// Like [`load_shelters_csv`] but accepts any `Read` source.
///
/// Rows with out-of-range coordinates are skipped with a warning; rows that
/// do not parse at all fail the load.
pub fn load_shelters_reader<R: Read>(reader: R) -> ServiceResult<Vec<Shelter>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut shelters = Vec::new();

    for (i, result) in csv_reader.deserialize::<ShelterRecord>().enumerate() {
        let row = result?;
        if !GeoPoint::new(row.lat, row.lon).is_valid() {
            warn!(row = i, lat = row.lat, lon = row.lon, "skipping shelter with invalid coordinate");
            continue;
        }
        shelters.push(Shelter { name: row.name, lat: row.lat, lon: row.lon });
    }
    Ok(shelters)
}
