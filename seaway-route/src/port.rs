//! C2 (Port Registry Loader) and C3 (Port Snapper).
//!
//! `Port` is an immutable record identified by `unlocode`; `PortRegistry`
//! owns the deduplicated list and the Haversine nearest-port search used to
//! resolve a free-form query coordinate to a canonical seaport.

use std::collections::HashMap;
use std::path::Path;

use seaway_common::{haversine_km, DEFAULT_MAX_SNAP_DISTANCE_KM};

use crate::coord;

/// Function-code position encoding "is a seaport" (§3).
const SEAPORT_FLAG: u8 = b'1';

/// Closed set of valid port statuses (§3, §4.2).
const VALID_STATUSES: [&str; 6] = ["AA", "AC", "AF", "AI", "AS", "RL"];

/// An immutable UN/LOCODE seaport record.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Port {
    pub unlocode: String,
    pub name: String,
    pub country_code: String,
    pub subdivision: String,
    pub lat: f64,
    pub lon: f64,
    pub function: String,
    pub status: String,
}

impl Port {
    /// ≥3 non-dash characters in `function` (§3).
    pub fn is_major_port(&self) -> bool {
        self.function.bytes().filter(|&b| b != b'-').count() >= 3
    }

    pub fn has_rail(&self) -> bool {
        self.function.as_bytes().get(1) == Some(&b'2')
    }

    pub fn has_road(&self) -> bool {
        self.function.as_bytes().get(2) == Some(&b'3')
    }

    pub fn has_airport(&self) -> bool {
        self.function.as_bytes().get(3) == Some(&b'4')
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        self.unlocode == other.unlocode
    }
}
impl Eq for Port {}

fn valid_status(status: &str) -> bool {
    VALID_STATUSES.contains(&status)
}

/// Owning, deduplicated-by-`unlocode` collection of seaports, in first-seen order.
#[derive(Debug, Default)]
pub struct PortRegistry {
    ports: Vec<Port>,
    index: HashMap<String, usize>,
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ports(ports: Vec<Port>) -> Self {
        let mut registry = Self::new();
        for port in ports {
            registry.insert(port);
        }
        registry
    }

    fn insert(&mut self, port: Port) {
        if let Some(&idx) = self.index.get(&port.unlocode) {
            self.ports[idx] = port;
        } else {
            self.index.insert(port.unlocode.clone(), self.ports.len());
            self.ports.push(port);
        }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, unlocode: &str) -> Option<&Port> {
        self.index.get(unlocode).map(|&idx| &self.ports[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Load and merge zero or more UN/LOCODE CSV files (§4.2). Missing files
    /// and malformed lines are logged and skipped, never fatal.
    pub fn load_seaports<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut registry = Self::new();
        for path in paths {
            let path = path.as_ref();
            match load_file(path) {
                Ok(ports) => {
                    for port in ports {
                        registry.insert(port);
                    }
                }
                Err(err) => {
                    log::warn!("skipping unreadable seaport file {}: {err}", path.display());
                }
            }
        }
        registry
    }

    /// C3: nearest-seaport search by Haversine distance, with the §4.3 guard rail.
    pub fn snap(&self, lat: f64, lon: f64, role: Role) -> Result<PortSnapResult, PortSnapError> {
        self.snap_with_threshold(lat, lon, role, DEFAULT_MAX_SNAP_DISTANCE_KM)
    }

    pub fn snap_with_threshold(
        &self,
        lat: f64,
        lon: f64,
        role: Role,
        max_snap_distance_km: f64,
    ) -> Result<PortSnapResult, PortSnapError> {
        let mut best: Option<(&Port, f64)> = None;
        for port in &self.ports {
            let distance_km = haversine_km(lat, lon, port.lat, port.lon);
            match best {
                Some((_, best_dist)) if distance_km >= best_dist => {}
                _ => best = Some((port, distance_km)),
            }
        }

        let (port, distance_km) = best.ok_or(PortSnapError::NoSeaportFound { lat, lon, role })?;

        if distance_km > max_snap_distance_km {
            return Err(PortSnapError::NoSeaportWithinRange {
                lat,
                lon,
                nearest_unlocode: port.unlocode.clone(),
                distance_km,
                role,
            });
        }

        Ok(PortSnapResult {
            unlocode: port.unlocode.clone(),
            name: port.name.clone(),
            snapped_lat: port.lat,
            snapped_lon: port.lon,
            query_lat: lat,
            query_lon: lon,
            distance_km,
            method: "NEAREST_SEAPORT",
            role,
        })
    }
}

fn load_file(path: &Path) -> Result<Vec<Port>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut ports = Vec::new();
    for (line_no, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(err) => {
                log::debug!("skipping malformed CSV record at line {}: {err}", line_no + 1);
                continue;
            }
        };
        if let Some(port) = parse_record(&record) {
            ports.push(port);
        }
    }
    Ok(ports)
}

/// Apply the §4.2 column semantics and filter predicate to one CSV record.
fn parse_record(record: &csv::StringRecord) -> Option<Port> {
    if record.len() < 11 {
        return None;
    }

    let change = record.get(0).unwrap_or("");
    let country_code = record.get(1).unwrap_or("").to_string();
    let location_code = record.get(2).unwrap_or("");
    let name_native = record.get(3).unwrap_or("");
    let name_ascii = record.get(4).unwrap_or("");
    let subdivision = record.get(5).unwrap_or("").to_string();
    let function = record.get(6).unwrap_or("");
    let status = record.get(7).unwrap_or("");
    let coordinates = record.get(10).unwrap_or("");

    if change == "X" {
        return None;
    }
    if location_code.is_empty() {
        return None;
    }
    if function.is_empty() || function.as_bytes().first() != Some(&SEAPORT_FLAG) {
        return None;
    }
    if !valid_status(status) {
        return None;
    }
    let (lat, lon) = coord::parse(coordinates)?;

    let name = if name_ascii.is_empty() { name_native } else { name_ascii };

    Some(Port {
        unlocode: format!("{country_code}{location_code}").to_uppercase(),
        name: name.to_string(),
        country_code,
        subdivision,
        lat,
        lon,
        function: function.to_string(),
        status: status.to_string(),
    })
}

/// Role a query point plays in a maritime leg (§4.3); affects only message
/// composition, never the snap policy itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Role {
    PortOfLoading,
    PortOfDischarge,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PortSnapResult {
    pub unlocode: String,
    pub name: String,
    pub snapped_lat: f64,
    pub snapped_lon: f64,
    pub query_lat: f64,
    pub query_lon: f64,
    pub distance_km: f64,
    pub method: &'static str,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub enum PortSnapError {
    NoSeaportFound {
        lat: f64,
        lon: f64,
        role: Role,
    },
    NoSeaportWithinRange {
        lat: f64,
        lon: f64,
        nearest_unlocode: String,
        distance_km: f64,
        role: Role,
    },
}

impl std::fmt::Display for PortSnapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortSnapError::NoSeaportFound { lat, lon, role } => {
                write!(f, "no seaport found for {role:?} at ({lat:.4}, {lon:.4}): registry is empty")
            }
            PortSnapError::NoSeaportWithinRange {
                lat,
                lon,
                nearest_unlocode,
                distance_km,
                role,
            } => write!(
                f,
                "no seaport within range for {role:?} at ({lat:.4}, {lon:.4}); nearest is {nearest_unlocode} at {distance_km:.1} km"
            ),
        }
    }
}

impl std::error::Error for PortSnapError {}

impl From<PortSnapError> for seaway_common::Error {
    fn from(err: PortSnapError) -> Self {
        match err {
            PortSnapError::NoSeaportFound { lat, lon, .. } => seaway_common::Error::NoSeaportFound { lat, lon },
            PortSnapError::NoSeaportWithinRange {
                lat,
                lon,
                nearest_unlocode,
                distance_km,
                ..
            } => seaway_common::Error::NoSeaportWithinRange {
                lat,
                lon,
                nearest_unlocode,
                distance_km,
            },
        }
    }
}
