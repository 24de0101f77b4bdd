//! Historical incident dataset: load-once store with a spatial index.
//!
//! The dataset is static reference data loaded exactly once per process
//! lifetime. The store is constructed at startup and injected by reference
//! wherever scoring needs it (no module-level global), which keeps the core
//! testable with an in-memory fake.

use std::path::{Path, PathBuf};

use log::{debug, info};
use once_cell::sync::OnceCell;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, SafetyError};
use crate::{GeoBound, GeoPoint};

/// One historical incident record.
///
/// Coordinates are kept in the string form the dataset carries and parsed on
/// demand; records with unparsable coordinates simply never match a corridor
/// bound. Any other dataset fields ride along unmodified in `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub latitude: String,
    #[serde(deserialize_with = "string_or_number")]
    pub longitude: String,
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Incident {
    /// Incident with the given id and coordinates, no extra metadata.
    pub fn new(id: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.to_string(),
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Parse the stored coordinates.
    ///
    /// Returns `None` when either coordinate is unparsable or outside the
    /// WGS84 range — the incident is treated as having no location.
    pub fn location(&self) -> Option<GeoPoint> {
        let lat = self.latitude.trim().parse::<f64>().ok()?;
        let lng = self.longitude.trim().parse::<f64>().ok()?;
        let point = GeoPoint::new(lat, lng);
        point.is_valid().then_some(point)
    }
}

/// Accept both `"12.97"` and `12.97` for dataset fields.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// Top-level shape of the dataset file.
#[derive(Debug, Deserialize)]
struct IncidentDataset {
    data: Vec<Incident>,
}

/// Incident entry in the R-tree spatial index.
#[derive(Debug, Clone)]
struct IndexedIncident {
    id: String,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedIncident {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

/// Dataset loaded into memory, plus its spatial index.
struct LoadedData {
    incidents: Vec<Incident>,
    index: RTree<IndexedIncident>,
}

impl LoadedData {
    fn build(incidents: Vec<Incident>) -> Self {
        let indexed: Vec<IndexedIncident> = incidents
            .iter()
            .filter_map(|incident| {
                incident.location().map(|p| IndexedIncident {
                    id: incident.id.clone(),
                    lat: p.latitude,
                    lng: p.longitude,
                })
            })
            .collect();

        let skipped = incidents.len() - indexed.len();
        if skipped > 0 {
            debug!(
                "{} incidents without usable coordinates left out of the spatial index",
                skipped
            );
        }
        info!(
            "Loaded {} incidents ({} spatially indexed)",
            incidents.len(),
            indexed.len()
        );

        Self {
            incidents,
            index: RTree::bulk_load(indexed),
        }
    }
}

/// Load-once store for the historical incident dataset.
///
/// The first access to the data performs blocking I/O exactly once; racing
/// first accesses are single-flighted by the underlying `OnceCell`, so all
/// callers observe the same completed load. A failed load is fatal to the
/// calling operation (no partial or zero-incident fallback) but a later call
/// may retry.
pub struct IncidentStore {
    source: PathBuf,
    loaded: OnceCell<LoadedData>,
}

impl IncidentStore {
    /// Store backed by a JSON dataset file. Nothing is read until first use.
    pub fn new<P: AsRef<Path>>(source: P) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            loaded: OnceCell::new(),
        }
    }

    /// Store pre-populated with in-memory incidents (no backing file).
    pub fn from_incidents(incidents: Vec<Incident>) -> Self {
        let loaded = OnceCell::new();
        let _ = loaded.set(LoadedData::build(incidents));
        Self {
            source: PathBuf::new(),
            loaded,
        }
    }

    /// Force the dataset to load now. Idempotent; subsequent calls no-op.
    pub fn load(&self) -> Result<()> {
        self.data().map(|_| ())
    }

    /// All incident records in the dataset.
    pub fn all(&self) -> Result<&[Incident]> {
        Ok(&self.data()?.incidents)
    }

    /// Ids of incidents whose coordinates fall inside `bound` (closed
    /// interval on all four edges), answered from the spatial index.
    pub fn incidents_in_bound(&self, bound: &GeoBound) -> Result<Vec<&str>> {
        let data = self.data()?;
        let envelope = AABB::from_corners(
            [bound.south_west.longitude, bound.south_west.latitude],
            [bound.north_east.longitude, bound.north_east.latitude],
        );
        Ok(data
            .index
            .locate_in_envelope(&envelope)
            .map(|entry| entry.id.as_str())
            .collect())
    }

    fn data(&self) -> Result<&LoadedData> {
        self.loaded
            .get_or_try_init(|| load_dataset(&self.source).map(LoadedData::build))
    }
}

fn load_dataset(path: &Path) -> Result<Vec<Incident>> {
    let raw = std::fs::read_to_string(path).map_err(|e| SafetyError::DataUnavailable {
        message: format!("{}: {}", path.display(), e),
    })?;
    let dataset: IncidentDataset =
        serde_json::from_str(&raw).map_err(|e| SafetyError::DataUnavailable {
            message: format!("{}: {}", path.display(), e),
        })?;
    Ok(dataset.data)
}
