//! evac — command-line driver for the evacuation routing engine.
//!
//! Loads a road network, optional flood polygons, and a shelter list, then
//! answers one routing request and prints the JSON response on stdout.
//!
//! ```text
//! evac --roads roads.geojson --flood flood_polygons.geojson \
//!      --shelters-csv shelters.csv --lat 13.0604 --lon 80.2496
//!
//! # built-in demo network, with a 600 m flood circle in the middle of it
//! evac --flood-buffer 13.0700,80.2600,600 --lat 13.0600 --lon 80.2500
//!
//! # also write every road with its blocked/safe status
//! evac --flood flood_polygons.geojson --export-roads roads_with_status.geojson \
//!      --roads roads.geojson --shelters-csv shelters.csv --lat 13.0604 --lon 80.2496
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` for per-request detail.

mod network;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use er_core::GeoPoint;
use er_service::{
    FloodSource, GeoJsonFile, RoadSource, RoutingService, ServiceConfig, load_shelters_csv,
    write_roads_geojson,
};
use er_spatial::FloodRegion;

/// Vertices used to approximate a `--flood-buffer` circle.
const BUFFER_SEGMENTS: usize = 32;

// ── Arguments ─────────────────────────────────────────────────────────────────

/// A circular flood zone given as `lat,lon,radius_m`.
#[derive(Clone, Debug)]
struct FloodBuffer {
    center:   GeoPoint,
    radius_m: f64,
}

fn parse_flood_buffer(s: &str) -> Result<FloodBuffer, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<_, _>>()?;
    let [lat, lon, radius_m] = parts[..] else {
        return Err(format!("expected lat,lon,radius_m, got {s:?}"));
    };
    let center = GeoPoint::try_new(lat, lon).map_err(|e| e.to_string())?;
    if !(radius_m.is_finite() && radius_m > 0.0) {
        return Err(format!("radius must be positive, got {radius_m}"));
    }
    Ok(FloodBuffer { center, radius_m })
}

#[derive(Parser, Debug)]
#[command(name = "evac", about = "Route a location to the nearest flood-safe shelter")]
struct Args {
    /// Road network GeoJSON (LineString features).  Omit to use the built-in
    /// demo network.
    #[arg(long)]
    roads: Option<PathBuf>,

    /// Flood polygons GeoJSON.
    #[arg(long)]
    flood: Option<PathBuf>,

    /// Extra circular flood zone `lat,lon,radius_m`; repeatable.
    #[arg(long, value_parser = parse_flood_buffer, allow_hyphen_values = true)]
    flood_buffer: Vec<FloodBuffer>,

    /// Service configuration JSON (shelters, snap radius).
    #[arg(long, conflicts_with = "shelters_csv")]
    config: Option<PathBuf>,

    /// Shelter table with header `name,lat,lon`.
    #[arg(long)]
    shelters_csv: Option<PathBuf>,

    /// Override the configured snap radius in metres.
    #[arg(long)]
    max_snap_m: Option<f64>,

    /// Request latitude.
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Request longitude.
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Write the flooded road network, one feature per edge with a
    /// `status` of `blocked` or `safe`.
    #[arg(long)]
    export_roads: Option<PathBuf>,

    /// Pretty-print the JSON response.
    #[arg(long)]
    pretty: bool,
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let t0 = Instant::now();

    // ── Roads and shelters ────────────────────────────────────────────────────
    let (network, demo_shelters) = match &args.roads {
        Some(path) => {
            let source = GeoJsonFile::new(path);
            let net = source
                .load_roads()
                .with_context(|| format!("loading roads from {}", path.display()))?;
            (net, None)
        }
        None => {
            info!("no --roads given, using the built-in demo network");
            let (net, shelters) = network::build_network()?;
            (net, Some(shelters))
        }
    };

    let mut config = if let Some(path) = &args.config {
        ServiceConfig::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?
    } else if let Some(path) = &args.shelters_csv {
        let shelters = load_shelters_csv(path)
            .with_context(|| format!("loading shelters from {}", path.display()))?;
        ServiceConfig::new(shelters)
    } else if let Some(shelters) = demo_shelters {
        ServiceConfig::new(shelters)
    } else {
        bail!("--roads needs shelters: pass --config or --shelters-csv");
    };
    if let Some(m) = args.max_snap_m {
        config = config.with_max_snap_distance_m(m);
    }

    let service = RoutingService::new(config, network)?;

    // ── Flood ─────────────────────────────────────────────────────────────────
    let mut region = match &args.flood {
        Some(path) => GeoJsonFile::new(path)
            .load_flood()
            .with_context(|| format!("loading flood polygons from {}", path.display()))?,
        None => FloodRegion::empty(),
    };
    for buf in &args.flood_buffer {
        region = region.merge(FloodRegion::buffer(buf.center, buf.radius_m, BUFFER_SEGMENTS));
    }
    if !region.is_empty() {
        let blocked = service.apply_flood(region);
        info!(blocked = blocked.len(), "flood applied");
    }

    if let Some(path) = &args.export_roads {
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let written = write_roads_geojson(&service.snapshot().network, BufWriter::new(file))
            .with_context(|| format!("writing roads to {}", path.display()))?;
        info!(features = written, path = %path.display(), "roads exported");
    }

    // ── Request ───────────────────────────────────────────────────────────────
    let response = service.respond(args.lat, args.lon);
    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{json}");

    info!(elapsed_ms = t0.elapsed().as_millis() as u64, "done");
    Ok(())
}
