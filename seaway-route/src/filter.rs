//! C6: chokepoint-aware edge filter and the routing-engine abstraction the
//! dispatch glue (§9 "Polymorphism over routing engines") selects between.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::chokepoint::ChokepointRegistry;
use crate::seagraph::SeaLaneGraph;

/// A node identifier in the sea-lane graph.
pub type NodeId = u32;

/// Query-time edge filter: excludes a set of graph nodes without mutating
/// the graph. Constructed per request, holds no back-reference to the
/// registry it may have been derived from (§9 cyclic-reference resolution).
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    excluded: HashSet<NodeId>,
}

impl EdgeFilter {
    /// An empty filter: accepts everything.
    pub fn none() -> Self {
        EdgeFilter::default()
    }

    pub fn from_excluded_nodes(excluded: HashSet<NodeId>) -> Self {
        EdgeFilter { excluded }
    }

    /// Build a filter from chokepoint ids, resolved through the registry
    /// into the node-id set to exclude.
    pub fn from_chokepoint_ids(ids: &[String], registry: &ChokepointRegistry) -> Self {
        EdgeFilter {
            excluded: registry.excluded_node_ids(ids),
        }
    }

    /// Accept iff neither endpoint is excluded; an empty exclusion set
    /// always accepts.
    pub fn accept(&self, edge: (NodeId, NodeId)) -> bool {
        if self.excluded.is_empty() {
            return true;
        }
        !self.excluded.contains(&edge.0) && !self.excluded.contains(&edge.1)
    }

    pub fn accepts_node(&self, node: NodeId) -> bool {
        self.excluded.is_empty() || !self.excluded.contains(&node)
    }
}

/// Result of a shortest-path computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathResult {
    pub distance_m: f64,
    pub time_ms: u64,
}

/// The capability set the dispatch switch is polymorphic over (§9): find the
/// nearest routable node to a coordinate, and compute a path between two
/// nodes, both honoring an `EdgeFilter`. The shortest-path algorithm itself
/// is out of scope (§1); `SeaLaneGraph`'s implementation below is a
/// reference Dijkstra, not a production contraction hierarchy.
pub trait RoutingEngine {
    fn find_closest(&self, lat: f64, lon: f64, filter: &EdgeFilter) -> Option<NodeId>;
    fn compute_path(&self, src: NodeId, tgt: NodeId, filter: &EdgeFilter) -> Option<PathResult>;
}

/// Average sea-lane speed used to turn a Dijkstra distance into a travel
/// time estimate; the actual speed model is out of this spec's scope.
const SEA_SPEED_M_PER_MS: f64 = 20.0 * 1852.0 / 3_600_000.0; // ~20 knots

impl RoutingEngine for SeaLaneGraph {
    fn find_closest(&self, lat: f64, lon: f64, filter: &EdgeFilter) -> Option<NodeId> {
        self.snap(lat, lon, filter, seaway_common::DEFAULT_MAX_SNAP_DISTANCE_M).ok()
    }

    fn compute_path(&self, src: NodeId, tgt: NodeId, filter: &EdgeFilter) -> Option<PathResult> {
        dijkstra(self, src, tgt, filter)
    }
}

#[derive(PartialEq)]
struct HeapEntry {
    distance_m: f64,
    node: NodeId,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance_m
            .partial_cmp(&self.distance_m)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn dijkstra(graph: &SeaLaneGraph, src: NodeId, tgt: NodeId, filter: &EdgeFilter) -> Option<PathResult> {
    if !filter.accepts_node(src) || !filter.accepts_node(tgt) {
        return None;
    }

    let mut dist = vec![f64::INFINITY; graph.node_count()];
    let mut heap = BinaryHeap::new();
    dist[src as usize] = 0.0;
    heap.push(HeapEntry { distance_m: 0.0, node: src });

    while let Some(HeapEntry { distance_m, node }) = heap.pop() {
        if node == tgt {
            let time_ms = (distance_m / SEA_SPEED_M_PER_MS).round() as u64;
            return Some(PathResult { distance_m, time_ms });
        }
        if distance_m > dist[node as usize] {
            continue;
        }
        for &(neighbor, weight) in graph.neighbors(node) {
            if !filter.accept((node, neighbor)) {
                continue;
            }
            let next = distance_m + weight;
            if next < dist[neighbor as usize] {
                dist[neighbor as usize] = next;
                heap.push(HeapEntry { distance_m: next, node: neighbor });
            }
        }
    }

    None
}

/// Stub road-routing engine, present only so the mode dispatch in
/// [`crate::dispatch`] is a real two-armed match rather than a single branch
/// (§9 Design Notes). Road-path computation is external to this spec (§1).
#[derive(Debug, Default)]
pub struct RoadEngine;

impl RoutingEngine for RoadEngine {
    fn find_closest(&self, _lat: f64, _lon: f64, _filter: &EdgeFilter) -> Option<NodeId> {
        None
    }

    fn compute_path(&self, _src: NodeId, _tgt: NodeId, _filter: &EdgeFilter) -> Option<PathResult> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seagraph::{SeaEdge, SeaNode};

    fn line_graph() -> SeaLaneGraph {
        let nodes = vec![
            SeaNode { lat: 0.0, lon: 0.0 },
            SeaNode { lat: 0.0, lon: 1.0 },
            SeaNode { lat: 0.0, lon: 2.0 },
        ];
        let edges = vec![
            SeaEdge { a: 0, b: 1, distance_m: 1000.0 },
            SeaEdge { a: 1, b: 2, distance_m: 1000.0 },
        ];
        SeaLaneGraph::from_nodes_edges(nodes, edges)
    }

    #[test]
    fn empty_filter_accepts_every_edge() {
        let filter = EdgeFilter::none();
        assert!(filter.accept((0, 1)));
        assert!(filter.accept((999, 1000)));
    }

    #[test]
    fn s5_filter_rejects_edges_touching_excluded_nodes() {
        let mut registry = ChokepointRegistry::new();
        registry.add(crate::chokepoint::Chokepoint::new("SUEZ", "Suez", "AFRICA", 30.8, 32.3, 2.0, 0.5).with_node_ids([100, 101, 102].into_iter().collect()));
        registry.add(crate::chokepoint::Chokepoint::new("PANAMA", "Panama", "AMERICAS", 9.1, -79.7, 2.0, 0.5).with_node_ids([200, 201].into_iter().collect()));

        let filter = EdgeFilter::from_chokepoint_ids(&["SUEZ".to_string(), "PANAMA".to_string()], &registry);
        assert!(!filter.accept((101, 50)));
        assert!(!filter.accept((50, 200)));
        assert!(filter.accept((50, 60)));
    }

    #[test]
    fn dijkstra_finds_shortest_path_through_line_graph() {
        let graph = line_graph();
        let path = graph.compute_path(0, 2, &EdgeFilter::none()).unwrap();
        assert!((path.distance_m - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn dijkstra_respects_filter_excluding_middle_node() {
        let graph = line_graph();
        let filter = EdgeFilter::from_excluded_nodes([1].into_iter().collect());
        assert!(graph.compute_path(0, 2, &filter).is_none());
    }

    #[test]
    fn find_closest_snaps_to_the_nearest_graph_node() {
        let graph = line_graph();
        let node = graph.find_closest(0.0, 0.9, &EdgeFilter::none()).unwrap();
        assert_eq!(node, 1);
    }

    #[test]
    fn road_engine_stub_never_resolves() {
        let road = RoadEngine;
        assert!(road.find_closest(0.0, 0.0, &EdgeFilter::none()).is_none());
        assert!(road.compute_path(0, 1, &EdgeFilter::none()).is_none());
    }
}
