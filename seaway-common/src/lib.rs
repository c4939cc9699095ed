//! Shared error types and geodesy constants for the seaway-route maritime
//! routing core.

pub mod error;

pub use error::{Error, Result};

/// Mean Earth radius in kilometers, per the spec's Haversine definition (§4.3, GLOSSARY).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default nearest-seaport snap guard rail (§4.3).
pub const DEFAULT_MAX_SNAP_DISTANCE_KM: f64 = 300.0;

/// Default sea-graph node snap guard rail (§4.6).
pub const DEFAULT_MAX_SNAP_DISTANCE_M: f64 = 300_000.0;

/// Latitude band the sea-lane grid and chokepoint densification stay within (§4.5 Stage 2/3).
pub const GRID_LAT_BOUND: f64 = 80.0;

/// k-nearest-neighbor fan-out used when building candidate edges (§4.5 Stage 5).
pub const KNN_K: usize = 6;

/// Great-circle distance in kilometers between two lon/lat points, Haversine on a
/// sphere of radius [`EARTH_RADIUS_KM`].
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1r, lat2r) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1r.cos() * lat2r.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Antimeridian-aware great-circle distance (§4.5 Stage 5): the minimum of the
/// direct distance and the two distances obtained by shifting one point's
/// longitude by ±360°. Guarantees the Pacific is never routed the "long way"
/// around through the Indian Ocean chokepoints.
pub fn haversine_km_antimeridian(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let direct = haversine_km(lat1, lon1, lat2, lon2);
    let plus = haversine_km(lat1, lon1 + 360.0, lat2, lon2);
    let minus = haversine_km(lat1, lon1 - 360.0, lat2, lon2);
    direct.min(plus).min(minus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_for_identical_points() {
        assert!(haversine_km(10.0, 20.0, 10.0, 20.0) < 1e-9);
    }

    #[test]
    fn antimeridian_distance_never_exceeds_naive() {
        let d_naive = haversine_km(35.0, 179.0, 35.0, -179.0);
        let d_anti = haversine_km_antimeridian(35.0, 179.0, 35.0, -179.0);
        assert!(d_anti <= d_naive + 1e-9);
        // the true distance across the dateline is small, not ~20000km
        assert!(d_anti < 300.0);
    }

    #[test]
    fn antimeridian_distance_matches_shorter_wrapped_form() {
        let lat1 = 35.0;
        let lon1 = 179.5;
        let lat2 = -36.0;
        let lon2 = -179.5;
        let d_anti = haversine_km_antimeridian(lat1, lon1, lat2, lon2);
        let wrapped_plus = haversine_km(lat1, lon1 + 360.0, lat2, lon2);
        let wrapped_minus = haversine_km(lat1, lon1 - 360.0, lat2, lon2);
        let direct = haversine_km(lat1, lon1, lat2, lon2);
        let expected = direct.min(wrapped_plus).min(wrapped_minus);
        assert!((d_anti - expected).abs() < 1e-9);
    }
}
