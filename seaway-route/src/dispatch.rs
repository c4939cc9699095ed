//! C6 per-request dispatch (§4.6): mode-based routing between the road and
//! sea engines, port snapping, chokepoint exclusion, and the boundary DTOs.
//!
//! The HTTP transport and request/response JSON wire format these DTOs ride
//! over belongs to an external matrix service and is out of scope here (§1);
//! this module only type-checks the contract end-to-end.

use seaway_common::{Error, Result, GRID_LAT_BOUND};

use crate::chokepoint::ChokepointRegistry;
use crate::filter::{EdgeFilter, RoadEngine, RoutingEngine};
use crate::port::{PortRegistry, PortSnapResult, Role};
use crate::seagraph::{LandMask, SeaLaneGraph};

/// Routing mode selector (§4.6, §6); defaults to `Road`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Road,
    Sea,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Road
    }
}

/// A matrix request, restricted to the fields the core cares about (§6).
#[derive(Debug, Clone)]
pub struct MatrixRequest {
    pub mode: Mode,
    /// Query coordinates in input order.
    pub points: Vec<(f64, f64)>,
    /// Indices into `points` acting as sources (port of loading); every other
    /// index plays the destination (port of discharge) role.
    pub sources: Vec<usize>,
    pub excluded_chokepoints: Vec<String>,
    pub validate_coordinates: bool,
}

/// One resolved (source, destination) cell of the routed matrix.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MatrixCell {
    pub source_index: usize,
    pub destination_index: usize,
    pub distance_m: Option<f64>,
    pub time_ms: Option<u64>,
    pub unreachable: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MatrixResponse {
    pub mode: Mode,
    pub excluded_chokepoints: Vec<String>,
    pub port_snaps: Vec<PortSnapResult>,
    pub cells: Vec<MatrixCell>,
}

/// Drop unknown chokepoint ids and duplicates, preserving first-seen order
/// (§4.6 "excluded_chokepoints echoed (canonicalized, unknown ids dropped)").
fn canonicalize_excluded(ids: &[String], registry: &ChokepointRegistry) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| registry.get(id).is_some())
        .filter(|id| seen.insert((*id).clone()))
        .cloned()
        .collect()
}

fn validate_coordinate(lat: f64, lon: f64, land_mask: Option<&LandMask>) -> Result<()> {
    if lat.abs() > GRID_LAT_BOUND {
        return Err(Error::PolarRegionUnsupported { lat });
    }
    if let Some(mask) = land_mask {
        if mask.contains(lon, lat) {
            return Err(Error::CoordinateOnLand { lat, lon });
        }
    }
    Ok(())
}

/// Dispatch one matrix request (§4.6). `Mode::Road` requests bypass C3–C6
/// entirely and are handed to `road_engine` unchanged; the engine's actual
/// path computation is out of scope (§1), so its cells are whatever
/// `road_engine` returns for each requested pair.
#[allow(clippy::too_many_arguments)]
pub fn route(
    request: &MatrixRequest,
    ports: &PortRegistry,
    chokepoints: &ChokepointRegistry,
    sea_graph: &SeaLaneGraph,
    road_engine: &RoadEngine,
    land_mask: Option<&LandMask>,
    max_snap_distance_m: f64,
) -> Result<MatrixResponse> {
    let excluded_chokepoints = canonicalize_excluded(&request.excluded_chokepoints, chokepoints);

    match request.mode {
        Mode::Road => {
            let filter = EdgeFilter::none();
            let cells = road_cells(request, road_engine, &filter);
            Ok(MatrixResponse {
                mode: Mode::Road,
                excluded_chokepoints,
                port_snaps: Vec::new(),
                cells,
            })
        }
        Mode::Sea => route_sea(request, ports, chokepoints, sea_graph, land_mask, max_snap_distance_m, excluded_chokepoints),
    }
}

fn road_cells(request: &MatrixRequest, road_engine: &RoadEngine, filter: &EdgeFilter) -> Vec<MatrixCell> {
    let sources: std::collections::HashSet<usize> = request.sources.iter().copied().collect();
    let mut cells = Vec::new();
    for &src in &request.sources {
        for dst in 0..request.points.len() {
            if sources.contains(&dst) {
                continue;
            }
            let (slat, slon) = request.points[src];
            let (dlat, dlon) = request.points[dst];
            let cell = match (
                road_engine.find_closest(slat, slon, filter),
                road_engine.find_closest(dlat, dlon, filter),
            ) {
                (Some(s), Some(d)) => match road_engine.compute_path(s, d, filter) {
                    Some(path) => MatrixCell {
                        source_index: src,
                        destination_index: dst,
                        distance_m: Some(path.distance_m),
                        time_ms: Some(path.time_ms),
                        unreachable: false,
                    },
                    None => unreachable_cell(src, dst),
                },
                _ => unreachable_cell(src, dst),
            };
            cells.push(cell);
        }
    }
    cells
}

fn unreachable_cell(source_index: usize, destination_index: usize) -> MatrixCell {
    MatrixCell {
        source_index,
        destination_index,
        distance_m: None,
        time_ms: None,
        unreachable: true,
    }
}

fn route_sea(
    request: &MatrixRequest,
    ports: &PortRegistry,
    chokepoints: &ChokepointRegistry,
    sea_graph: &SeaLaneGraph,
    land_mask: Option<&LandMask>,
    max_snap_distance_m: f64,
    excluded_chokepoints: Vec<String>,
) -> Result<MatrixResponse> {
    let sources: std::collections::HashSet<usize> = request.sources.iter().copied().collect();

    // Step 1-2: snap every point to its canonical port coordinates.
    let mut port_snaps = Vec::with_capacity(request.points.len());
    let mut snapped_points = Vec::with_capacity(request.points.len());
    for (i, &(lat, lon)) in request.points.iter().enumerate() {
        if request.validate_coordinates {
            validate_coordinate(lat, lon, land_mask)?;
        }
        let role = if sources.contains(&i) {
            Role::PortOfLoading
        } else {
            Role::PortOfDischarge
        };
        let snap = ports.snap(lat, lon, role)?;
        snapped_points.push((snap.snapped_lat, snap.snapped_lon));
        port_snaps.push(snap);
    }

    // Step 3: build the edge filter from the canonicalized exclusion set.
    let filter = EdgeFilter::from_chokepoint_ids(&excluded_chokepoints, chokepoints);

    // Step 4: sea-node snap both endpoints and delegate to the routing engine.
    let mut cells = Vec::new();
    for &src in &request.sources {
        let (src_lat, src_lon) = snapped_points[src];
        let src_node = sea_graph.snap(src_lat, src_lon, &filter, max_snap_distance_m);

        for dst in 0..request.points.len() {
            if sources.contains(&dst) {
                continue;
            }
            let (dst_lat, dst_lon) = snapped_points[dst];
            let cell = match (&src_node, sea_graph.snap(dst_lat, dst_lon, &filter, max_snap_distance_m)) {
                (Ok(s), Ok(d)) => match sea_graph.compute_path(*s, d, &filter) {
                    Some(path) => MatrixCell {
                        source_index: src,
                        destination_index: dst,
                        distance_m: Some(path.distance_m),
                        time_ms: Some(path.time_ms),
                        unreachable: false,
                    },
                    None => unreachable_cell(src, dst),
                },
                _ => unreachable_cell(src, dst),
            };
            cells.push(cell);
        }
    }

    Ok(MatrixResponse {
        mode: Mode::Sea,
        excluded_chokepoints,
        port_snaps,
        cells,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Port;
    use crate::seagraph::{SeaEdge, SeaNode};

    fn sample_ports() -> PortRegistry {
        PortRegistry::from_ports(vec![
            Port {
                unlocode: "NLRTM".into(),
                name: "Rotterdam".into(),
                country_code: "NL".into(),
                subdivision: "".into(),
                lat: 51.9167,
                lon: 4.5,
                function: "1234----".into(),
                status: "AI".into(),
            },
            Port {
                unlocode: "SGSIN".into(),
                name: "Singapore".into(),
                country_code: "SG".into(),
                subdivision: "".into(),
                lat: 1.2833,
                lon: 103.85,
                function: "1--3----".into(),
                status: "AI".into(),
            },
        ])
    }

    fn line_graph() -> SeaLaneGraph {
        let nodes = vec![
            SeaNode { lat: 51.9167, lon: 4.5 },
            SeaNode { lat: 20.0, lon: 50.0 },
            SeaNode { lat: 1.2833, lon: 103.85 },
        ];
        let edges = vec![
            SeaEdge { a: 0, b: 1, distance_m: 5_000_000.0 },
            SeaEdge { a: 1, b: 2, distance_m: 5_000_000.0 },
        ];
        SeaLaneGraph::from_nodes_edges(nodes, edges)
    }

    #[test]
    fn canonicalize_drops_unknown_ids_and_dedupes() {
        let mut registry = ChokepointRegistry::new();
        registry.add(crate::chokepoint::Chokepoint::new("SUEZ", "Suez", "AFRICA", 30.8, 32.3, 2.0, 0.5));
        let ids = vec!["SUEZ".to_string(), "SUEZ".to_string(), "NOT_REAL".to_string()];
        let canonical = canonicalize_excluded(&ids, &registry);
        assert_eq!(canonical, vec!["SUEZ".to_string()]);
    }

    #[test]
    fn sea_mode_snaps_ports_and_routes_through_graph() {
        let request = MatrixRequest {
            mode: Mode::Sea,
            points: vec![(52.0, 4.3), (1.3, 103.8)],
            sources: vec![0],
            excluded_chokepoints: vec![],
            validate_coordinates: false,
        };
        let ports = sample_ports();
        let chokepoints = ChokepointRegistry::new();
        let graph = line_graph();
        let road = RoadEngine;

        let response = route(&request, &ports, &chokepoints, &graph, &road, None, 300_000.0).unwrap();
        assert_eq!(response.mode, Mode::Sea);
        assert_eq!(response.port_snaps.len(), 2);
        assert_eq!(response.port_snaps[0].role, Role::PortOfLoading);
        assert_eq!(response.port_snaps[1].role, Role::PortOfDischarge);
        assert_eq!(response.cells.len(), 1);
        assert!(!response.cells[0].unreachable);
    }

    #[test]
    fn sea_mode_excludes_chokepoint_nodes_from_the_path() {
        let mut chokepoints = ChokepointRegistry::new();
        chokepoints.add(
            crate::chokepoint::Chokepoint::new("MIDPOINT", "Midpoint", "TEST", 20.0, 50.0, 1.0, 0.5)
                .with_node_ids([1].into_iter().collect()),
        );
        let request = MatrixRequest {
            mode: Mode::Sea,
            points: vec![(52.0, 4.3), (1.3, 103.8)],
            sources: vec![0],
            excluded_chokepoints: vec!["MIDPOINT".to_string()],
            validate_coordinates: false,
        };
        let ports = sample_ports();
        let graph = line_graph();
        let road = RoadEngine;

        let response = route(&request, &ports, &chokepoints, &graph, &road, None, 300_000.0).unwrap();
        assert_eq!(response.excluded_chokepoints, vec!["MIDPOINT".to_string()]);
        assert!(response.cells[0].unreachable);
    }

    #[test]
    fn road_mode_bypasses_port_snapping() {
        let request = MatrixRequest {
            mode: Mode::Road,
            points: vec![(52.0, 4.3), (1.3, 103.8)],
            sources: vec![0],
            excluded_chokepoints: vec![],
            validate_coordinates: false,
        };
        let ports = sample_ports();
        let chokepoints = ChokepointRegistry::new();
        let graph = line_graph();
        let road = RoadEngine;

        let response = route(&request, &ports, &chokepoints, &graph, &road, None, 300_000.0).unwrap();
        assert!(response.port_snaps.is_empty());
        // the road engine is a stub: every cell is unreachable, but the dispatch wiring ran
        assert_eq!(response.cells.len(), 1);
        assert!(response.cells[0].unreachable);
    }
}
