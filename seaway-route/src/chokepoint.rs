//! C4: Chokepoint Registry.
//!
//! Holds chokepoint metadata (center, densification parameters, and, once
//! the sea-lane graph has been built, the set of node indices belonging to
//! each chokepoint) and answers the query-time "which nodes does excluding
//! these chokepoints remove" question used by C6's edge filter.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use seaway_common::Result;

/// A named maritime chokepoint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Chokepoint {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub region: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "radiusDegrees", default)]
    pub radius_degrees: f64,
    #[serde(rename = "stepDegrees", default)]
    pub step_degrees: f64,
    #[serde(rename = "nodeIds", default)]
    pub node_ids: HashSet<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Chokepoint {
    pub fn new(id: impl Into<String>, name: impl Into<String>, region: impl Into<String>, lat: f64, lon: f64, radius_degrees: f64, step_degrees: f64) -> Self {
        Chokepoint {
            id: id.into(),
            name: name.into(),
            region: region.into(),
            lat,
            lon,
            radius_degrees,
            step_degrees,
            node_ids: HashSet::new(),
            enabled: true,
        }
    }

    /// Returns a new chokepoint with `node_ids` replaced; chokepoints are
    /// otherwise immutable once assigned (§3).
    pub fn with_node_ids(&self, node_ids: HashSet<u32>) -> Self {
        Chokepoint {
            node_ids,
            ..self.clone()
        }
    }
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct ChokepointFile {
    chokepoints: Vec<Chokepoint>,
}

/// `{id -> Chokepoint}` registry, keyed by `id` (§4.4).
#[derive(Debug, Default)]
pub struct ChokepointRegistry {
    by_id: HashMap<String, Chokepoint>,
    order: Vec<String>,
}

impl ChokepointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let parsed: ChokepointFile = serde_json::from_reader(reader)?;
        let mut registry = Self::new();
        for cp in parsed.chokepoints {
            registry.add(cp);
        }
        Ok(registry)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let payload = ChokepointFile {
            chokepoints: self.order.iter().map(|id| self.by_id[id].clone()).collect(),
        };
        serde_json::to_writer_pretty(writer, &payload)?;
        Ok(())
    }

    /// Adding an existing id replaces the previous value (§4.4 invariant);
    /// its position in iteration order is preserved.
    pub fn add(&mut self, chokepoint: Chokepoint) {
        if !self.by_id.contains_key(&chokepoint.id) {
            self.order.push(chokepoint.id.clone());
        }
        self.by_id.insert(chokepoint.id.clone(), chokepoint);
    }

    pub fn get(&self, id: &str) -> Option<&Chokepoint> {
        self.by_id.get(id)
    }

    pub fn size(&self) -> usize {
        self.by_id.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chokepoint> {
        self.order.iter().map(move |id| &self.by_id[id])
    }

    /// Union of `node_ids` over known chokepoints in `ids`; unknown ids are
    /// silently ignored, and an empty or absent list yields the empty set.
    pub fn excluded_node_ids(&self, ids: &[String]) -> HashSet<u32> {
        ids.iter()
            .filter_map(|id| self.by_id.get(id))
            .flat_map(|cp| cp.node_ids.iter().copied())
            .collect()
    }
}

/// Hard-coded mandatory chokepoint catalog (§4.5), in catalog order — used
/// both to seed an empty registry before a build and to break ties when
/// tagging primary-grid waypoints near more than one chokepoint.
pub fn mandatory_catalog() -> Vec<Chokepoint> {
    vec![
        Chokepoint::new("SUEZ", "Suez Canal", "AFRICA", 30.8123, 32.3179, 2.0, 0.5),
        Chokepoint::new("PANAMA", "Panama Canal", "AMERICAS", 9.0832, -79.6776, 2.0, 0.5),
        Chokepoint::new("MALACCA", "Strait of Malacca", "ASIA", 2.5, 101.0, 3.0, 0.5),
        Chokepoint::new("GIBRALTAR", "Strait of Gibraltar", "EUROPE", 35.9429, -5.6147, 2.0, 0.5),
        Chokepoint::new("BOSPHORUS", "Bosphorus Strait", "EUROPE", 41.0976, 29.0606, 2.0, 0.5),
        Chokepoint::new("CAPE_GOOD_HOPE", "Cape of Good Hope", "AFRICA", -34.3532, 18.2282, 3.0, 1.0),
        Chokepoint::new("BAB_EL_MANDEB", "Bab-el-Mandeb", "MIDDLE_EAST", 12.6, 43.3, 2.0, 0.5),
        Chokepoint::new("HORMUZ", "Strait of Hormuz", "MIDDLE_EAST", 26.5, 56.3, 2.0, 0.5),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_edge_filter_exclusion_node_sets() {
        let mut registry = ChokepointRegistry::new();
        registry.add(Chokepoint::new("SUEZ", "Suez Canal", "AFRICA", 30.8123, 32.3179, 2.0, 0.5).with_node_ids([100, 101, 102].into_iter().collect()));
        registry.add(Chokepoint::new("PANAMA", "Panama Canal", "AMERICAS", 9.0832, -79.6776, 2.0, 0.5).with_node_ids([200, 201].into_iter().collect()));

        let excluded = registry.excluded_node_ids(&["SUEZ".to_string(), "PANAMA".to_string()]);
        assert_eq!(excluded, [100, 101, 102, 200, 201].into_iter().collect());
    }

    #[test]
    fn unknown_ids_are_silently_ignored() {
        let mut registry = ChokepointRegistry::new();
        registry.add(Chokepoint::new("SUEZ", "Suez Canal", "AFRICA", 30.8123, 32.3179, 2.0, 0.5).with_node_ids([1, 2].into_iter().collect()));
        let excluded = registry.excluded_node_ids(&["SUEZ".to_string(), "NOT_REAL".to_string()]);
        assert_eq!(excluded, [1, 2].into_iter().collect());
    }

    #[test]
    fn empty_list_yields_empty_set() {
        let registry = ChokepointRegistry::new();
        assert!(registry.excluded_node_ids(&[]).is_empty());
    }

    #[test]
    fn adding_existing_id_replaces_previous_value() {
        let mut registry = ChokepointRegistry::new();
        registry.add(Chokepoint::new("SUEZ", "Suez Canal", "AFRICA", 30.8123, 32.3179, 2.0, 0.5));
        registry.add(Chokepoint::new("SUEZ", "Suez Canal Renamed", "AFRICA", 30.8123, 32.3179, 2.0, 0.5));
        assert_eq!(registry.size(), 1);
        assert_eq!(registry.get("SUEZ").unwrap().name, "Suez Canal Renamed");
    }

    #[test]
    fn s6_save_and_load_round_trips() {
        let mut registry = ChokepointRegistry::new();
        registry.add(Chokepoint::new("SUEZ", "Suez Canal", "AFRICA", 30.8123, 32.3179, 2.0, 0.5).with_node_ids([100, 101, 102].into_iter().collect()));
        registry.add(Chokepoint::new("PANAMA", "Panama Canal", "AMERICAS", 9.0832, -79.6776, 2.0, 0.5).with_node_ids([200, 201].into_iter().collect()));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chokepoints.json");
        registry.save_to(&path).unwrap();

        let reloaded = ChokepointRegistry::load_from(&path).unwrap();
        assert_eq!(reloaded.size(), 2);
        assert_eq!(reloaded.get("SUEZ").unwrap().node_ids, registry.get("SUEZ").unwrap().node_ids);
        assert_eq!(reloaded.get("PANAMA").unwrap().node_ids, registry.get("PANAMA").unwrap().node_ids);
    }

    #[test]
    fn optional_fields_default_on_load() {
        let json = r#"{ "chokepoints": [ { "id": "SUEZ", "lat": 30.585, "lon": 32.265 } ] }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.json");
        std::fs::write(&path, json).unwrap();

        let registry = ChokepointRegistry::load_from(&path).unwrap();
        let cp = registry.get("SUEZ").unwrap();
        assert_eq!(cp.region, "");
        assert_eq!(cp.radius_degrees, 0.0);
        assert_eq!(cp.step_degrees, 0.0);
        assert!(cp.node_ids.is_empty());
    }

    #[test]
    fn mandatory_catalog_has_eight_entries_in_order() {
        let catalog = mandatory_catalog();
        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog[0].id, "SUEZ");
        assert_eq!(catalog[7].id, "HORMUZ");
    }
}
