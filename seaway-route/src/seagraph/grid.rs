//! C5 Stages 2–3: waypoint grid generation and chokepoint densification.

use crate::chokepoint::Chokepoint;

/// A build-time candidate node: a coordinate, a dense sequential index, and
/// an optional chokepoint tag (§3 Waypoint).
#[derive(Debug, Clone)]
pub struct Waypoint {
    pub index: usize,
    pub lat: f64,
    pub lon: f64,
    pub chokepoint_id: Option<String>,
}

/// Latitude band the primary grid and densification both stay within (§4.5).
pub const LAT_BOUND: f64 = 80.0;

/// Generate the primary grid: `lat ∈ [-80, 80]` inclusive of both bounds,
/// `lon ∈ [-180, 180)` inclusive lower / exclusive upper, both stepped by
/// `grid_step_degrees`. Each cell is tagged with the nearest chokepoint
/// within `2 × grid_step_degrees` planar degrees, ties broken by catalog
/// order (§9: this planar metric is a documented approximation near the
/// poles, acceptable within the ±80° band it's restricted to).
pub fn primary_grid(grid_step_degrees: f64, chokepoints: &[Chokepoint]) -> Vec<Waypoint> {
    let tag_radius = 2.0 * grid_step_degrees;
    let mut waypoints = Vec::new();
    let mut index = 0usize;

    for lat in inclusive_steps(-LAT_BOUND, LAT_BOUND, grid_step_degrees) {
        for lon in lower_inclusive_upper_exclusive_steps(-180.0, 180.0, grid_step_degrees) {
            let chokepoint_id = tag_nearest_chokepoint(lat, lon, tag_radius, chokepoints);
            waypoints.push(Waypoint {
                index,
                lat,
                lon,
                chokepoint_id,
            });
            index += 1;
        }
    }

    waypoints
}

/// Generate the densified grid for every chokepoint (§4.5 Stage 3), continuing
/// the dense index space after `start_index` (the size of the primary grid).
pub fn densify_chokepoints(start_index: usize, chokepoints: &[Chokepoint]) -> Vec<Waypoint> {
    let mut waypoints = Vec::new();
    let mut index = start_index;

    for cp in chokepoints {
        for dlat in inclusive_steps(-cp.radius_degrees, cp.radius_degrees, cp.step_degrees) {
            for dlon in inclusive_steps(-cp.radius_degrees, cp.radius_degrees, cp.step_degrees) {
                if dlat == 0.0 && dlon == 0.0 {
                    continue;
                }
                if (dlat * dlat + dlon * dlon).sqrt() > cp.radius_degrees {
                    continue;
                }
                let lat = cp.lat + dlat;
                if lat.abs() > LAT_BOUND {
                    continue;
                }
                let lon = normalize_lon(cp.lon + dlon);
                waypoints.push(Waypoint {
                    index,
                    lat,
                    lon,
                    chokepoint_id: Some(cp.id.clone()),
                });
                index += 1;
            }
        }

        // The chokepoint center itself is always included, even though the
        // zero-offset neighborhood point above is deliberately skipped (§9).
        waypoints.push(Waypoint {
            index,
            lat: cp.lat,
            lon: normalize_lon(cp.lon),
            chokepoint_id: Some(cp.id.clone()),
        });
        index += 1;
    }

    waypoints
}

fn tag_nearest_chokepoint(lat: f64, lon: f64, radius: f64, chokepoints: &[Chokepoint]) -> Option<String> {
    let mut best: Option<(usize, f64)> = None;
    for (i, cp) in chokepoints.iter().enumerate() {
        let dlat = lat - cp.lat;
        let dlon = lon - cp.lon;
        let dist = (dlat * dlat + dlon * dlon).sqrt();
        if dist > radius {
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| chokepoints[i].id.clone())
}

/// Step `start..=stop` by `step`, tolerant of float accumulation error so
/// that e.g. `-80.0..=80.0` by `5.0` reliably includes both endpoints.
fn inclusive_steps(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let mut values = Vec::new();
    if step <= 0.0 {
        return values;
    }
    let n = ((stop - start) / step).round() as i64;
    for i in 0..=n {
        let v = start + i as f64 * step;
        values.push(if v > stop { stop } else { v });
    }
    values
}

/// Step `start..stop` (lower inclusive, upper exclusive) by `step` — used
/// for longitude so the antimeridian is represented exactly once.
fn lower_inclusive_upper_exclusive_steps(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let mut values = Vec::new();
    if step <= 0.0 {
        return values;
    }
    let n = ((stop - start) / step).round() as i64;
    for i in 0..n {
        values.push(start + i as f64 * step);
    }
    values
}

fn normalize_lon(mut lon: f64) -> f64 {
    while lon >= 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chokepoint::mandatory_catalog;

    #[test]
    fn pole_extremes_included_dateline_excluded() {
        let waypoints = primary_grid(5.0, &[]);
        let lats: std::collections::HashSet<i64> = waypoints.iter().map(|w| (w.lat * 1000.0).round() as i64).collect();
        assert!(lats.contains(&((-80.0_f64 * 1000.0) as i64)));
        assert!(lats.contains(&((80.0_f64 * 1000.0) as i64)));
        let lons: std::collections::HashSet<i64> = waypoints.iter().map(|w| (w.lon * 1000.0).round() as i64).collect();
        assert!(!lons.contains(&((180.0_f64 * 1000.0) as i64)));
        assert!(lons.contains(&((-180.0_f64 * 1000.0) as i64)));
    }

    #[test]
    fn indices_are_dense_and_sequential() {
        let waypoints = primary_grid(20.0, &[]);
        for (i, w) in waypoints.iter().enumerate() {
            assert_eq!(w.index, i);
        }
    }

    #[test]
    fn densify_continues_index_space_and_includes_center() {
        let catalog = mandatory_catalog();
        let suez = vec![catalog[0].clone()];
        let dense = densify_chokepoints(1000, &suez);
        assert!(dense.iter().all(|w| w.index >= 1000));
        let center = &suez[0];
        assert!(dense.iter().any(|w| (w.lat - center.lat).abs() < 1e-9 && (w.lon - center.lon).abs() < 1e-9));
    }

    #[test]
    fn densify_excludes_exact_zero_offset_duplicate_of_center() {
        // the center is appended once at the end; no other point is emitted
        // at the zero offset, so exactly one point coincides with the center.
        let catalog = mandatory_catalog();
        let suez = vec![catalog[0].clone()];
        let dense = densify_chokepoints(0, &suez);
        let center = &suez[0];
        let coincident = dense
            .iter()
            .filter(|w| (w.lat - center.lat).abs() < 1e-9 && (w.lon - center.lon).abs() < 1e-9)
            .count();
        assert_eq!(coincident, 1);
    }

    #[test]
    fn tagging_breaks_ties_by_catalog_order() {
        let a = Chokepoint::new("A", "A", "R", 0.0, 0.0, 1.0, 1.0);
        let b = Chokepoint::new("B", "B", "R", 0.0, 0.0, 1.0, 1.0);
        let tag = tag_nearest_chokepoint(0.0, 0.0, 10.0, &[a, b]);
        assert_eq!(tag.as_deref(), Some("A"));
    }

    #[test]
    fn points_outside_tag_radius_are_untagged() {
        let catalog = mandatory_catalog();
        let tag = tag_nearest_chokepoint(0.0, 0.0, 1.0, &catalog);
        assert!(tag.is_none());
    }

    #[test]
    fn normalizes_longitude_across_multiple_wraps() {
        assert!((normalize_lon(540.0) - (-180.0)).abs() < 1e-9);
        assert!((normalize_lon(-540.0) - (-180.0)).abs() < 1e-9);
    }
}
