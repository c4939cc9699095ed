//! Error types for the seaway-route maritime routing core.
//!
//! One flat enum covers every failure mode in the spec's error taxonomy
//! (coordinate/CSV loading, port snapping, land-mask validation, graph
//! build invariants). Parsing and loading failures are recoverable locally
//! by their callers (skip-and-log); snapping, graph-snap, and build-time
//! invariant failures are not and always surface as an `Error` value.

use std::fmt;
use std::path::PathBuf;

/// Main error type for seaway-route operations.
#[derive(Debug)]
pub enum Error {
    /// C3: no port in the registry was within `max_snap_distance_km`.
    NoSeaportWithinRange {
        lat: f64,
        lon: f64,
        nearest_unlocode: String,
        distance_km: f64,
    },

    /// C3: the port registry was empty.
    NoSeaportFound { lat: f64, lon: f64 },

    /// Request validator: query coordinate resolves inside land geometry.
    CoordinateOnLand { lat: f64, lon: f64 },

    /// Request validator: query coordinate is beyond the supported latitude band.
    PolarRegionUnsupported { lat: f64 },

    /// C6: nearest sea-graph node snap failed or exceeded the distance guard.
    GraphSnapFailed {
        lat: f64,
        lon: f64,
        distance_m: Option<f64>,
    },

    /// C5 Stage 1: the land mask source was missing, empty, or unreadable.
    LandMaskLoadFailed { source: PathBuf, reason: String },

    /// C5 Stage 9: connectivity invariant violated under `strict_connectivity`.
    ConnectivityInvariantViolated {
        component_count: usize,
        largest_component_size: usize,
        unreachable: Vec<String>,
    },

    /// C5/C4: non-positive step, empty catalog, or similar misconfiguration.
    InvalidConfig(String),

    /// File or serialization I/O failure (build output, registry load/save).
    IoFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoSeaportWithinRange {
                lat,
                lon,
                nearest_unlocode,
                distance_km,
            } => write!(
                f,
                "no seaport within range of ({lat:.4}, {lon:.4}); nearest is {nearest_unlocode} at {distance_km:.1} km"
            ),
            Error::NoSeaportFound { lat, lon } => {
                write!(f, "no seaport found for ({lat:.4}, {lon:.4}): port registry is empty")
            }
            Error::CoordinateOnLand { lat, lon } => {
                write!(f, "coordinate ({lat:.4}, {lon:.4}) lies on land")
            }
            Error::PolarRegionUnsupported { lat } => {
                write!(f, "latitude {lat:.4} is outside the supported ±80° band")
            }
            Error::GraphSnapFailed { lat, lon, distance_m } => match distance_m {
                Some(d) => write!(
                    f,
                    "graph snap for ({lat:.4}, {lon:.4}) exceeded max distance ({d:.0} m)"
                ),
                None => write!(f, "graph snap for ({lat:.4}, {lon:.4}) failed: no reachable node"),
            },
            Error::LandMaskLoadFailed { source, reason } => {
                write!(f, "failed to load land mask from {}: {reason}", source.display())
            }
            Error::ConnectivityInvariantViolated {
                component_count,
                largest_component_size,
                unreachable,
            } => write!(
                f,
                "connectivity invariant violated: {component_count} components, largest has {largest_component_size} nodes, unreachable: {}",
                unreachable.join(", ")
            ),
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Error::IoFailed(msg) => write!(f, "I/O failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoFailed(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::IoFailed(format!("JSON error: {err}"))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::IoFailed(format!("CSV error: {err}"))
    }
}

impl From<shapefile::Error> for Error {
    fn from(err: shapefile::Error) -> Self {
        Error::IoFailed(format!("shapefile error: {err}"))
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::IoFailed(format!("bincode error: {err}"))
    }
}

/// Convenience result type for seaway-route operations.
pub type Result<T> = std::result::Result<T, Error>;
