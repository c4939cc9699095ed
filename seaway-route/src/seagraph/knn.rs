//! C5 Stages 5–6: antimeridian-aware k-NN candidate edges and land-crossing
//! rejection.

use std::collections::HashSet;

use rstar::{primitives::GeomWithData, RTree};
use seaway_common::haversine_km_antimeridian;

use super::grid::Waypoint;
use super::land::LandMask;

/// A candidate (or accepted) edge, canonically ordered `a < b`.
#[derive(Debug, Clone, Copy)]
pub struct EdgeCandidate {
    pub a: usize,
    pub b: usize,
    pub distance_km: f64,
}

/// How many Euclidean-nearest R-tree hits to pool per waypoint before
/// re-ranking by true distance. Degree-space Euclidean distance and
/// antimeridian-aware great-circle distance agree closely near the equator
/// but diverge as latitude grows (a degree of longitude shrinks by
/// `cos(lat)`), so the pool must be wider than `k` to reliably contain the
/// true `k` nearest once re-sorted.
const CANDIDATE_POOL_FACTOR: usize = 4;
const CANDIDATE_POOL_MIN: usize = 8;

/// Find up to `k` nearest neighbors of every waypoint by antimeridian-aware
/// great-circle distance (§4.5 Stage 5), deduplicated to canonical
/// `(min, max)` pairs.
///
/// The R-tree is seeded with three copies of every point, shifted by `0`,
/// `+360`, and `-360` degrees of longitude; because each waypoint is queried
/// at its own unshifted coordinate, the nearest-neighbor walk transparently
/// picks up points that are geographically close across the dateline via
/// their shifted copy. The R-tree's own iteration order is only a degree-space
/// Euclidean ranking, though, so it's used purely to gather a candidate pool;
/// the final top-`k` selection is re-ranked by real `haversine_km_antimeridian`
/// distance before being kept.
///
/// `waypoints` must be dense and index-aligned: `waypoints[i].index == i`.
pub fn k_nearest_candidates(waypoints: &[Waypoint], k: usize) -> Vec<EdgeCandidate> {
    let mut points = Vec::with_capacity(waypoints.len() * 3);
    for w in waypoints {
        points.push(GeomWithData::new([w.lon, w.lat], w.index));
        points.push(GeomWithData::new([w.lon + 360.0, w.lat], w.index));
        points.push(GeomWithData::new([w.lon - 360.0, w.lat], w.index));
    }
    let tree = RTree::bulk_load(points);

    let pool_size = (k * CANDIDATE_POOL_FACTOR).max(k + CANDIDATE_POOL_MIN);

    let mut seen_pairs: HashSet<(usize, usize)> = HashSet::new();
    let mut candidates = Vec::new();

    for w in waypoints {
        let mut seen_nodes: HashSet<usize> = HashSet::new();
        seen_nodes.insert(w.index);

        let mut pool: Vec<(usize, f64)> = Vec::with_capacity(pool_size);
        for point in tree.nearest_neighbor_iter(&[w.lon, w.lat]) {
            if !seen_nodes.insert(point.data) {
                continue;
            }
            let other = &waypoints[point.data];
            let distance_km = haversine_km_antimeridian(w.lat, w.lon, other.lat, other.lon);
            pool.push((point.data, distance_km));
            if pool.len() == pool_size {
                break;
            }
        }

        pool.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        for &(other_index, distance_km) in pool.iter().take(k) {
            let pair = if w.index < other_index {
                (w.index, other_index)
            } else {
                (other_index, w.index)
            };
            if seen_pairs.insert(pair) {
                candidates.push(EdgeCandidate {
                    a: pair.0,
                    b: pair.1,
                    distance_km,
                });
            }
        }
    }

    candidates
}

/// Reject a candidate edge if its great-circle segment intersects land
/// (§4.5 Stage 6), splitting antimeridian-crossing segments at ±180° via a
/// midpoint heuristic before testing each half.
pub fn crosses_land(mask: &LandMask, u: &Waypoint, v: &Waypoint) -> bool {
    if (v.lon - u.lon).abs() <= 180.0 {
        mask.intersects_segment((u.lon, u.lat), (v.lon, v.lat))
    } else {
        let mid_lat = (u.lat + v.lat) / 2.0;
        let (u_split_lon, v_split_lon) = if u.lon > 0.0 { (180.0, -180.0) } else { (-180.0, 180.0) };
        mask.intersects_segment((u.lon, u.lat), (u_split_lon, mid_lat))
            || mask.intersects_segment((v_split_lon, mid_lat), (v.lon, v.lat))
    }
}

#[cfg(test)]
mod tests {
    use geo::{Coord, LineString, MultiPolygon, Polygon};

    use super::*;

    fn square(min: (f64, f64), max: (f64, f64)) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: min.0, y: min.1 },
                Coord { x: max.0, y: min.1 },
                Coord { x: max.0, y: max.1 },
                Coord { x: min.0, y: max.1 },
                Coord { x: min.0, y: min.1 },
            ]),
            vec![],
        )
    }

    fn wp(index: usize, lat: f64, lon: f64) -> Waypoint {
        Waypoint {
            index,
            lat,
            lon,
            chokepoint_id: None,
        }
    }

    #[test]
    fn finds_up_to_k_distinct_neighbors_per_node() {
        let waypoints: Vec<Waypoint> = (0..10).map(|i| wp(i, 0.0, i as f64 * 10.0)).collect();
        let candidates = k_nearest_candidates(&waypoints, 3);
        let mut degree = vec![0usize; waypoints.len()];
        for c in &candidates {
            degree[c.a] += 1;
            degree[c.b] += 1;
        }
        // every node has at least its 3 nearest neighbors represented in some direction
        assert!(degree.iter().all(|&d| d >= 2));
    }

    #[test]
    fn candidate_pairs_are_canonically_ordered_and_deduplicated() {
        let waypoints: Vec<Waypoint> = (0..5).map(|i| wp(i, 0.0, i as f64)).collect();
        let candidates = k_nearest_candidates(&waypoints, 6);
        let mut seen = HashSet::new();
        for c in &candidates {
            assert!(c.a < c.b);
            assert!(seen.insert((c.a, c.b)), "duplicate edge {:?}-{:?}", c.a, c.b);
        }
    }

    #[test]
    fn antimeridian_neighbors_are_found_across_the_dateline() {
        // Shanghai-ish and Los-Angeles-ish longitudes straddling the dateline
        let waypoints = vec![wp(0, 31.0, 179.5), wp(1, 34.0, -179.5), wp(2, 30.0, 32.0)];
        let candidates = k_nearest_candidates(&waypoints, 1);
        // node 0's nearest neighbor must be node 1 (across the dateline), not node 2 (via Suez)
        let pair01 = candidates.iter().any(|c| (c.a, c.b) == (0, 1));
        assert!(pair01);
    }

    #[test]
    fn crosses_land_rejects_a_direct_segment_through_land() {
        let mask = LandMask::from_geometry(MultiPolygon::new(vec![square((0.0, 0.0), (10.0, 10.0))]));
        let u = wp(0, 5.0, -5.0);
        let v = wp(1, 5.0, 15.0);
        assert!(crosses_land(&mask, &u, &v));
    }

    #[test]
    fn crosses_land_accepts_a_direct_segment_clear_of_land() {
        let mask = LandMask::from_geometry(MultiPolygon::new(vec![square((0.0, 0.0), (10.0, 10.0))]));
        let u = wp(0, 50.0, -5.0);
        let v = wp(1, 50.0, 15.0);
        assert!(!crosses_land(&mask, &u, &v));
    }

    #[test]
    fn crosses_land_rejects_an_antimeridian_segment_that_passes_through_land_near_the_split() {
        let mask = LandMask::from_geometry(MultiPolygon::new(vec![square((179.0, -1.0), (180.0, 1.0))]));
        let u = wp(0, 0.0, 179.5);
        let v = wp(1, 0.0, -179.5);
        assert!(crosses_land(&mask, &u, &v));
    }

    #[test]
    fn crosses_land_accepts_an_antimeridian_segment_clear_of_land() {
        let mask = LandMask::from_geometry(MultiPolygon::new(vec![square((0.0, 0.0), (10.0, 10.0))]));
        let u = wp(0, 30.0, 179.5);
        let v = wp(1, 30.0, -179.5);
        assert!(!crosses_land(&mask, &u, &v));
    }
}
