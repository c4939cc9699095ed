//! C5 orchestration: the 10-stage offline pipeline (§4.5), connectivity
//! validation, and persistence.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use sha2::{Digest, Sha256};

use seaway_common::{haversine_km_antimeridian, Error, Result, KNN_K};

use crate::chokepoint::{mandatory_catalog, Chokepoint, ChokepointRegistry};
use crate::filter::{EdgeFilter, RoutingEngine};

use super::grid;
use super::knn;
use super::land::LandMask;
use super::{SeaEdge, SeaLaneGraph, SeaNode};

/// Coordinates the §8 S7 test suite requires to remain reachable from the
/// largest component alongside every mandatory chokepoint center.
const REQUIRED_CONNECTIVITY_POINTS: &[(&str, f64, f64)] = &[
    ("TOKYO", 35.68, 139.69),
    ("LOS_ANGELES", 33.74, -118.27),
    ("SHANGHAI", 31.23, 121.47),
    ("ROTTERDAM", 51.92, 4.5),
];

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub output_dir: PathBuf,
    pub land_mask_path: PathBuf,
    pub grid_step_degrees: f64,
    /// §9 Open Question: the source only warns on multi-component graphs;
    /// this implementation fails the build by default, as the spec text
    /// recommends, exposed here as a flag so both behaviors stay testable.
    pub strict_connectivity: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            output_dir: PathBuf::from("output"),
            land_mask_path: PathBuf::new(),
            grid_step_degrees: 5.0,
            strict_connectivity: true,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BuildSummary {
    #[serde(rename = "sea_graph_version")]
    pub version_hash: String,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(rename = "connected_component_count")]
    pub component_count: usize,
    pub largest_component_size: usize,
    pub build_duration_ms: u64,
    #[serde(rename = "waypoint_grid_step_degrees")]
    pub grid_step_degrees: f64,
    #[serde(rename = "chokepoint_densification_step_degrees")]
    pub chokepoint_step_degrees: f64,
    pub land_mask_source: String,
    pub build_timestamp: String,
}

impl BuildSummary {
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Per-stage waypoint/edge counts from one `build()` run (§4.5 Stage 10
/// supplement), written alongside `build_summary.json` for diagnosing a
/// build without re-running it.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BuildReport {
    pub grid_waypoint_count: usize,
    pub densified_waypoint_count: usize,
    pub land_filtered_out_count: usize,
    pub knn_candidate_count: usize,
    pub land_crossing_rejection_count: usize,
    pub accepted_edge_count: usize,
}

impl BuildReport {
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

/// Per-node connected-component membership, plus the aggregate counts §3's
/// `build_summary` needs (§4.5 Stage 9).
#[derive(Debug)]
pub struct ConnectivityReport {
    pub component_count: usize,
    pub largest_component_size: usize,
    component_of: Vec<usize>,
}

fn compute_connectivity(graph: &SeaLaneGraph) -> ConnectivityReport {
    let n = graph.node_count();
    let mut component_of = vec![usize::MAX; n];
    let mut component_sizes = Vec::new();

    for start in 0..n {
        if component_of[start] != usize::MAX {
            continue;
        }
        let comp_id = component_sizes.len();
        let mut queue = VecDeque::new();
        queue.push_back(start as u32);
        component_of[start] = comp_id;
        let mut size = 0usize;
        while let Some(u) = queue.pop_front() {
            size += 1;
            for &(v, _) in graph.neighbors(u) {
                if component_of[v as usize] == usize::MAX {
                    component_of[v as usize] = comp_id;
                    queue.push_back(v);
                }
            }
        }
        component_sizes.push(size);
    }

    let largest_component_size = component_sizes.iter().copied().max().unwrap_or(0);
    ConnectivityReport {
        component_count: component_sizes.len(),
        largest_component_size,
        component_of,
    }
}

fn validate_required_connectivity(
    graph: &SeaLaneGraph,
    connectivity: &ConnectivityReport,
    catalog: &[Chokepoint],
) -> Result<()> {
    let filter = EdgeFilter::none();
    let mut components_seen: HashSet<usize> = HashSet::new();
    let mut unreachable = Vec::new();

    for cp in catalog {
        match graph.find_closest(cp.lat, cp.lon, &filter) {
            Some(node) => {
                components_seen.insert(connectivity.component_of[node as usize]);
            }
            None => unreachable.push(cp.id.clone()),
        }
    }
    for (name, lat, lon) in REQUIRED_CONNECTIVITY_POINTS {
        match graph.find_closest(*lat, *lon, &filter) {
            Some(node) => {
                components_seen.insert(connectivity.component_of[node as usize]);
            }
            None => unreachable.push((*name).to_string()),
        }
    }

    if components_seen.len() > 1 || !unreachable.is_empty() {
        return Err(Error::ConnectivityInvariantViolated {
            component_count: connectivity.component_count,
            largest_component_size: connectivity.largest_component_size,
            unreachable,
        });
    }

    Ok(())
}

fn compute_version_hash(node_count: usize, edge_count: usize, build_timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(node_count.to_le_bytes());
    hasher.update(edge_count.to_le_bytes());
    hasher.update(build_timestamp.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}

/// Run the full 10-stage build (§4.5), returning the built graph, the
/// chokepoint registry with node ids assigned, and the build summary.
/// Persists the graph and all three JSON sidecars (`chokepoint_metadata.json`,
/// `build_summary.json`, `build_report.json`) under `config.output_dir`.
pub fn build(config: &BuildConfig) -> Result<(SeaLaneGraph, ChokepointRegistry, BuildSummary)> {
    if config.grid_step_degrees <= 0.0 {
        return Err(Error::InvalidConfig("grid_step_degrees must be positive".to_string()));
    }

    let start = Instant::now();

    // Stage 1
    let land_mask = LandMask::load(&config.land_mask_path)?;
    log::info!("stage 1: loaded land mask from {}", land_mask.source().display());

    let catalog = mandatory_catalog();

    // Stage 2
    let primary = grid::primary_grid(config.grid_step_degrees, &catalog);
    let primary_count = primary.len();
    log::info!("stage 2: generated {primary_count} primary grid waypoints");

    // Stage 3
    let dense = grid::densify_chokepoints(primary_count, &catalog);
    log::info!("stage 3: generated {} densified chokepoint waypoints", dense.len());

    let mut all_waypoints = primary;
    all_waypoints.extend(dense);
    let total_before_filter = all_waypoints.len();

    // Stage 4: land filtering, re-indexed densely
    let mut filtered = Vec::with_capacity(all_waypoints.len());
    let mut next_index = 0usize;
    for w in all_waypoints {
        if !land_mask.contains(w.lon, w.lat) {
            filtered.push(grid::Waypoint {
                index: next_index,
                ..w
            });
            next_index += 1;
        }
    }
    log::info!(
        "stage 4: land-filtered {}/{} waypoints retained",
        filtered.len(),
        total_before_filter
    );

    // Stage 5: antimeridian-aware k-NN candidates
    let candidates = knn::k_nearest_candidates(&filtered, KNN_K);
    log::info!("stage 5: generated {} k-NN candidate edges", candidates.len());

    // Stage 6: reject candidates whose segment crosses land
    let mut accepted: HashSet<(usize, usize)> = HashSet::new();
    let mut rejected_count = 0usize;
    for candidate in &candidates {
        let u = &filtered[candidate.a];
        let v = &filtered[candidate.b];
        if knn::crosses_land(&land_mask, u, v) {
            rejected_count += 1;
            continue;
        }
        accepted.insert((candidate.a, candidate.b));
    }
    log::info!(
        "stage 6: rejected {rejected_count} land-crossing edges, {} survive",
        accepted.len()
    );

    // Stage 7: edge insertion, canonical and deduplicated (`accepted` is a set)
    let edges: Vec<SeaEdge> = accepted
        .iter()
        .map(|&(a, b)| {
            let u = &filtered[a];
            let v = &filtered[b];
            let distance_km = haversine_km_antimeridian(u.lat, u.lon, v.lat, v.lon);
            SeaEdge {
                a: a as u32,
                b: b as u32,
                distance_m: distance_km * 1000.0,
            }
        })
        .collect();

    // Stage 8: chokepoint node map, built from surviving waypoint tags
    let mut node_map: HashMap<String, HashSet<u32>> = HashMap::new();
    for w in &filtered {
        if let Some(id) = &w.chokepoint_id {
            node_map.entry(id.clone()).or_default().insert(w.index as u32);
        }
    }
    let mut registry = ChokepointRegistry::new();
    for cp in &catalog {
        let node_ids = node_map.remove(&cp.id).unwrap_or_default();
        registry.add(cp.with_node_ids(node_ids));
    }

    let nodes: Vec<SeaNode> = filtered.iter().map(|w| SeaNode { lat: w.lat, lon: w.lon }).collect();
    let graph = SeaLaneGraph::from_nodes_edges(nodes, edges.clone());

    // Stage 9: connectivity validation
    let connectivity = compute_connectivity(&graph);
    if connectivity.component_count > 1 {
        log::warn!(
            "graph has {} connected components; largest holds {}/{} nodes",
            connectivity.component_count,
            connectivity.largest_component_size,
            graph.node_count()
        );
    }
    if config.strict_connectivity {
        validate_required_connectivity(&graph, &connectivity, &catalog)?;
    }

    // Stage 10: persistence
    graph.save(&config.output_dir)?;
    registry.save_to(config.output_dir.join("chokepoint_metadata.json"))?;

    let build_duration_ms = start.elapsed().as_millis() as u64;
    let build_timestamp = chrono::Utc::now().to_rfc3339();
    let version_hash = compute_version_hash(graph.node_count(), edges.len(), &build_timestamp);

    let summary = BuildSummary {
        version_hash,
        node_count: graph.node_count(),
        edge_count: edges.len(),
        component_count: connectivity.component_count,
        largest_component_size: connectivity.largest_component_size,
        build_duration_ms,
        grid_step_degrees: config.grid_step_degrees,
        // catalog's densification step is not uniform (Cape of Good Hope
        // uses 1.0° against the 0.5° the other seven chokepoints use); the
        // summary records the catalog-order-first value as representative.
        chokepoint_step_degrees: catalog[0].step_degrees,
        land_mask_source: config.land_mask_path.display().to_string(),
        build_timestamp,
    };
    summary.save_to(&config.output_dir.join("build_summary.json"))?;

    let report = BuildReport {
        grid_waypoint_count: primary_count,
        densified_waypoint_count: total_before_filter - primary_count,
        land_filtered_out_count: total_before_filter - filtered.len(),
        knn_candidate_count: candidates.len(),
        land_crossing_rejection_count: rejected_count,
        accepted_edge_count: edges.len(),
    };
    report.save_to(&config.output_dir.join("build_report.json"))?;

    Ok((graph, registry, summary))
}
