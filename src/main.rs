use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use disaster_geo::config::{load_config, Config};
use disaster_geo::geometry::Ring;
use disaster_geo::location::{Containment, LocationKind, LocationResolver};
use disaster_geo::server::{self, AppState};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// disaster-geo: location resolution and boundary cache
///
/// Turns place names into boundary polygons and answers point-in-region and
/// risk-zone queries for the disaster assistant.
///
/// Examples:
///   disaster-geo resolve India
///   disaster-geo resolve Mumbai --type city
///   disaster-geo contains --lat 20.59 --lon 78.96 India
///   disaster-geo zones India earthquake
///   disaster-geo add-zone India flood "Brahmaputra Basin" --ring "89.5,25.5;96,25.5;96,28;89.5,28"
///   disaster-geo serve
#[derive(Parser)]
#[command(name = "disaster-geo", version, about, long_about = None)]
struct Cli {
    /// Config file (JSON). Defaults to <data dir>/config.json when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the boundary and reference datasets.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// No network: cached or placeholder boundaries, no geocoding.
    #[arg(long, global = true)]
    offline: bool,

    /// Debug-level logging unless RUST_LOG says otherwise.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a place name to geometry and center.
    Resolve {
        name: String,
        #[arg(long = "type", short = 't', default_value = "country", value_parser = parse_kind)]
        kind: LocationKind,
    },
    /// Test whether a point lies inside a place.
    Contains {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        name: String,
        #[arg(long = "type", short = 't', default_value = "country", value_parser = parse_kind)]
        kind: LocationKind,
    },
    /// Bounding box of a country.
    Bbox { country: String },
    /// Risk zones of a country for one hazard kind.
    Zones { country: String, hazard: String },
    /// Add a risk zone polygon to a country.
    AddZone {
        country: String,
        hazard: String,
        zone: String,
        /// Exterior ring as "lon,lat;lon,lat;..." (closed automatically).
        #[arg(long, allow_hyphen_values = true, value_parser = parse_ring)]
        ring: Ring,
    },
    /// Show the canonical country name for free text.
    Normalize { text: String },
    /// Run the HTTP API.
    Serve {
        /// Listen address, overrides the configured one.
        #[arg(long)]
        addr: Option<String>,
    },
}

fn parse_kind(s: &str) -> Result<LocationKind, String> {
    s.parse().map_err(|e| format!("{}", e))
}

fn parse_ring(s: &str) -> Result<Ring, String> {
    s.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|pair| {
            let coords: Result<Vec<f64>, _> = pair.split(',').map(|v| v.trim().parse::<f64>()).collect();
            match coords {
                Ok(c) if c.len() == 2 => Ok(c),
                _ => Err(format!("Invalid position '{}'. Use 'lon,lat'.", pair)),
            }
        })
        .collect()
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "disaster_geo=debug,tower_http=debug,info"
    } else {
        "disaster_geo=info,tower_http=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        cfg.data_dir = dir.clone();
    }
    if cli.offline {
        cfg.offline = true;
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = build_config(&cli)?;
    tracing::debug!("data dir: {}", cfg.data_dir.display());

    let mut resolver = tokio::task::block_in_place(|| LocationResolver::from_config(&cfg))
        .context("failed to open boundary datasets")?;
    if resolver.store().is_degraded() {
        tracing::warn!("running on placeholder boundaries; only a coarse India outline is available");
    }

    match cli.command {
        Command::Resolve { name, kind } => {
            let resolution = tokio::task::block_in_place(|| resolver.resolve(&name, kind));
            print_json(resolution.as_ref())?;
            if !resolution.is_found() {
                std::process::exit(1);
            }
        }
        Command::Contains { lat, lon, name, kind } => {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                bail!("invalid coordinates. Lat: -90..90, Lon: -180..180");
            }
            let status = tokio::task::block_in_place(|| resolver.containment(lat, lon, &name, kind));
            print_json(&serde_json::json!({
                "name": name,
                "type": kind,
                "lat": lat,
                "lon": lon,
                "inside": status == Containment::Inside,
                "status": status,
            }))?;
        }
        Command::Bbox { country } => {
            let bbox = resolver.bounding_box(&country)?;
            print_json(&bbox)?;
        }
        Command::Zones { country, hazard } => {
            let zones = resolver.get_risk_zones(&country, &hazard)?;
            print_json(&zones)?;
        }
        Command::AddZone {
            country,
            hazard,
            zone,
            ring,
        } => {
            resolver.add_risk_zone(&country, &hazard, &zone, ring)?;
            let zones = resolver.get_risk_zones(&country, &hazard)?;
            eprintln!("  Added {} zone '{}' to {} ({} total)", hazard, zone, country, zones.len());
            print_json(&zones)?;
        }
        Command::Normalize { text } => {
            let canonical = resolver.normalize(&text);
            print_json(&serde_json::json!({ "input": text, "canonical": canonical }))?;
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| cfg.listen_addr.clone());
            let state = Arc::new(AppState::new(resolver));
            server::start(&addr, state).await?;
        }
    }
    Ok(())
}
