//! C5: the Sea-Lane Graph Builder pipeline, plus the persisted `SeaLaneGraph`
//! runtime type that C6 routes over.

pub mod builder;
pub mod grid;
pub mod knn;
pub mod land;

pub use builder::{build, BuildConfig, BuildReport, BuildSummary, ConnectivityReport};
pub use grid::Waypoint;
pub use land::LandMask;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rstar::{primitives::GeomWithData, RTree};
use seaway_common::{haversine_km, Error, Result};

/// A persisted graph node: just its coordinate (§3 SeaLaneGraph node set).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SeaNode {
    pub lat: f64,
    pub lon: f64,
}

/// A persisted undirected, weighted edge. Canonical form orders `a < b`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SeaEdge {
    pub a: u32,
    pub b: u32,
    pub distance_m: f64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct SerializedGraph {
    nodes: Vec<SeaNode>,
    edges: Vec<SeaEdge>,
}

/// The runtime sea-lane graph: an undirected weighted adjacency list plus an
/// R-tree spatial index for nearest-node queries. Immutable once loaded.
pub struct SeaLaneGraph {
    nodes: Vec<SeaNode>,
    adjacency: Vec<Vec<(u32, f64)>>,
    spatial_index: RTree<GeomWithData<[f64; 2], u32>>,
}

impl SeaLaneGraph {
    pub fn from_nodes_edges(nodes: Vec<SeaNode>, edges: Vec<SeaEdge>) -> Self {
        let mut adjacency = vec![Vec::new(); nodes.len()];
        for e in &edges {
            adjacency[e.a as usize].push((e.b, e.distance_m));
            adjacency[e.b as usize].push((e.a, e.distance_m));
        }
        let points: Vec<_> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| GeomWithData::new([n.lon, n.lat], i as u32))
            .collect();
        let spatial_index = RTree::bulk_load(points);
        SeaLaneGraph {
            nodes,
            adjacency,
            spatial_index,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(|a| a.len()).sum::<usize>() / 2
    }

    pub fn node(&self, id: u32) -> Option<&SeaNode> {
        self.nodes.get(id as usize)
    }

    pub fn neighbors(&self, id: u32) -> &[(u32, f64)] {
        &self.adjacency[id as usize]
    }

    fn edges(&self) -> Vec<SeaEdge> {
        let mut edges = Vec::new();
        for (u, neighbors) in self.adjacency.iter().enumerate() {
            for &(v, distance_m) in neighbors {
                if (u as u32) < v {
                    edges.push(SeaEdge { a: u as u32, b: v, distance_m });
                }
            }
        }
        edges
    }

    /// Persist nodes + edges in `output_dir` (§4.5 Stage 10). The spatial
    /// index is rebuilt on load rather than serialized.
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let serialized = SerializedGraph {
            nodes: self.nodes.clone(),
            edges: self.edges(),
        };
        let file = File::create(output_dir.join("sea_graph.bin"))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &serialized)?;
        Ok(())
    }

    pub fn load(output_dir: &Path) -> Result<Self> {
        let file = File::open(output_dir.join("sea_graph.bin"))?;
        let reader = BufReader::new(file);
        let serialized: SerializedGraph = bincode::deserialize_from(reader)?;
        Ok(Self::from_nodes_edges(serialized.nodes, serialized.edges))
    }

    /// C6 sea-node snapper: nearest reachable node honoring `filter`,
    /// failing if the snap distance exceeds `max_distance_m`.
    pub fn snap(
        &self,
        lat: f64,
        lon: f64,
        filter: &crate::filter::EdgeFilter,
        max_distance_m: f64,
    ) -> Result<u32> {
        for point in self.spatial_index.nearest_neighbor_iter(&[lon, lat]) {
            if !filter.accepts_node(point.data) {
                continue;
            }
            let node = &self.nodes[point.data as usize];
            let distance_m = haversine_km(lat, lon, node.lat, node.lon) * 1000.0;
            if distance_m > max_distance_m {
                return Err(Error::GraphSnapFailed {
                    lat,
                    lon,
                    distance_m: Some(distance_m),
                });
            }
            return Ok(point.data);
        }
        Err(Error::GraphSnapFailed { lat, lon, distance_m: None })
    }
}
