//! CLI commands for seaway-route.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use seaway_route::chokepoint::ChokepointRegistry;
use seaway_route::dispatch::{self, MatrixRequest, Mode};
use seaway_route::filter::RoadEngine;
use seaway_route::port::{PortRegistry, Role};
use seaway_route::seagraph::builder::{build, BuildConfig};
use seaway_route::seagraph::SeaLaneGraph;
use seaway_route::{coord, Error};

#[derive(Parser)]
#[command(name = "seaway-route")]
#[command(about = "Maritime sea-lane graph builder and routing core", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the sea-lane graph from a land-polygon mask (C5)
    Build {
        /// Land-mask source (shapefile or equivalent, EPSG:4326)
        #[arg(long)]
        land_mask: PathBuf,

        /// Output directory for sea_graph.bin, chokepoint_metadata.json, build_summary.json, build_report.json
        #[arg(short, long)]
        output: PathBuf,

        /// Waypoint grid step in degrees
        #[arg(long, default_value_t = 5.0)]
        grid_step_degrees: f64,

        /// Warn instead of failing the build on a disconnected graph
        #[arg(long)]
        lenient: bool,
    },

    /// Look up the nearest UN/LOCODE seaport for a coordinate (C2/C3)
    SnapPort {
        /// One or more UN/LOCODE CSV files
        #[arg(long = "ports", required = true)]
        ports: Vec<PathBuf>,

        /// Query coordinate, "lat,lon"
        coordinate: String,

        /// Maximum snap distance in kilometers
        #[arg(long, default_value_t = 300.0)]
        max_km: f64,
    },

    /// Compute a sea-lane route between two coordinates (C6)
    Route {
        /// Directory produced by `build`
        #[arg(long)]
        graph: PathBuf,

        /// One or more UN/LOCODE CSV files for port snapping
        #[arg(long = "ports", required = true)]
        ports: Vec<PathBuf>,

        /// Source coordinate, "lat,lon"
        from: String,

        /// Destination coordinate, "lat,lon"
        to: String,

        /// Chokepoint ids to exclude (repeatable)
        #[arg(long = "exclude")]
        excluded_chokepoints: Vec<String>,
    },
}

fn parse_coordinate_pair(s: &str) -> anyhow::Result<(f64, f64)> {
    let (lat_str, lon_str) = s
        .split_once(',')
        .context("coordinate must be in 'lat,lon' format")?;
    let lat: f64 = lat_str.trim().parse().context("invalid latitude")?;
    let lon: f64 = lon_str.trim().parse().context("invalid longitude")?;
    Ok((lat, lon))
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Build {
                land_mask,
                output,
                grid_step_degrees,
                lenient,
            } => {
                let config = BuildConfig {
                    output_dir: output.clone(),
                    land_mask_path: land_mask,
                    grid_step_degrees,
                    strict_connectivity: !lenient,
                };
                let (graph, _registry, summary) = build(&config)?;
                println!("sea graph built: {} nodes, {} edges", graph.node_count(), graph.edge_count());
                println!(
                    "version {} ({} component(s), largest {} nodes, {} ms)",
                    summary.version_hash, summary.component_count, summary.largest_component_size, summary.build_duration_ms
                );
                println!("wrote {}", output.display());
                Ok(())
            }

            Commands::SnapPort { ports, coordinate, max_km } => {
                let (lat, lon) = parse_coordinate_pair(&coordinate)?;
                let registry = PortRegistry::load_seaports(&ports);
                let result = registry
                    .snap_with_threshold(lat, lon, Role::PortOfLoading, max_km)
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                println!(
                    "{} ({}) at {:.1} km, canonical coordinate {}",
                    result.unlocode,
                    result.name,
                    result.distance_km,
                    coord::format(result.snapped_lat, result.snapped_lon).unwrap_or_default()
                );
                Ok(())
            }

            Commands::Route {
                graph,
                ports,
                from,
                to,
                excluded_chokepoints,
            } => {
                let (from_lat, from_lon) = parse_coordinate_pair(&from)?;
                let (to_lat, to_lon) = parse_coordinate_pair(&to)?;

                let port_registry = PortRegistry::load_seaports(&ports);
                let chokepoint_registry = ChokepointRegistry::load_from(graph.join("chokepoint_metadata.json"))
                    .map_err(anyhow_from_error)?;
                let sea_graph = SeaLaneGraph::load(&graph).map_err(anyhow_from_error)?;
                let road_engine = RoadEngine;

                let request = MatrixRequest {
                    mode: Mode::Sea,
                    points: vec![(from_lat, from_lon), (to_lat, to_lon)],
                    sources: vec![0],
                    excluded_chokepoints,
                    validate_coordinates: false,
                };

                let response = dispatch::route(
                    &request,
                    &port_registry,
                    &chokepoint_registry,
                    &sea_graph,
                    &road_engine,
                    None,
                    seaway_common::DEFAULT_MAX_SNAP_DISTANCE_M,
                )
                .map_err(anyhow_from_error)?;

                for snap in &response.port_snaps {
                    println!("{:?}: snapped to {} ({:.1} km)", snap.role, snap.unlocode, snap.distance_km);
                }
                for cell in &response.cells {
                    if cell.unreachable {
                        println!("no route found");
                    } else {
                        println!(
                            "distance: {:.0} m, time: {} ms",
                            cell.distance_m.unwrap_or_default(),
                            cell.time_ms.unwrap_or_default()
                        );
                    }
                }

                Ok(())
            }
        }
    }
}

fn anyhow_from_error(err: Error) -> anyhow::Error {
    anyhow::anyhow!("{err}")
}
