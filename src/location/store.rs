//! Country boundary store.
//!
//! Owns the persisted boundary dataset (`country_boundaries.json`, canonical
//! name → record), the reference dataset it is populated from, and a memo of
//! parsed shapes. Records are created lazily on first lookup and only change
//! through `add_risk_zone`. Persistence rewrites the whole file and assumes a
//! single writer. Records built from the placeholder are written only when a
//! risk zone is added, flagged so a later full dataset replaces their geometry.

use geo::MultiPolygon;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::reference::ReferenceDataset;
use super::types::{BoundaryRecord, LocationError, RiskZone, RiskZones};
use crate::config::Config;
use crate::geometry::containment::shape_contains;
use crate::geometry::{BoundingBox, Center, Geometry, Ring};

/// Country seeded with example risk zones when it has none.
const SEEDED_COUNTRY: &str = "India";

pub struct GeometryStore {
    path: PathBuf,
    boundaries: BTreeMap<String, BoundaryRecord>,
    reference: ReferenceDataset,
    shapes: HashMap<String, Arc<MultiPolygon<f64>>>,
}

impl GeometryStore {
    /// Load both datasets from the configured data directory, fetching the
    /// reference boundaries once if they are not cached locally.
    pub fn load(config: &Config) -> Result<Self, LocationError> {
        let reference = ReferenceDataset::load_or_fetch(
            &config.reference_path(),
            &config.reference_url,
            &config.user_agent,
            config.geocoder_timeout(),
            config.offline,
        )?;
        Self::open(config.boundaries_path(), reference)
    }

    /// Open the boundary file at `path` over an already loaded reference dataset.
    /// A missing file is created empty; a corrupt one is an error.
    pub fn open(path: PathBuf, reference: ReferenceDataset) -> Result<Self, LocationError> {
        let boundaries = read_boundaries(&path)?;
        let mut store = Self {
            path,
            boundaries,
            reference,
            shapes: HashMap::new(),
        };
        if !store.path.exists() {
            store.persist()?;
        }
        store.upgrade_placeholder_records();
        store.seed_default_risk_zones();
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_degraded(&self) -> bool {
        self.reference.is_degraded()
    }

    /// Every canonical name the store can answer for, sorted.
    pub fn canonical_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .boundaries
            .keys()
            .map(String::as_str)
            .chain(self.reference.names())
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Exact, case-sensitive lookup. A country seen for the first time is
    /// copied from the reference dataset and persisted.
    pub fn lookup_raw(&mut self, canonical_name: &str) -> Result<&BoundaryRecord, LocationError> {
        if !self.boundaries.contains_key(canonical_name) {
            let country = self
                .reference
                .get(canonical_name)
                .ok_or_else(|| LocationError::NotFound(canonical_name.to_string()))?;
            let record = BoundaryRecord {
                name: country.name.clone(),
                iso: country.iso.clone(),
                geometry: country.geometry.clone(),
                risk_zones: RiskZones::new(),
                placeholder: self.reference.is_degraded(),
            };
            self.boundaries.insert(canonical_name.to_string(), record);
            if self.reference.is_degraded() {
                tracing::debug!("placeholder record for '{}' kept in memory only", canonical_name);
            } else if let Err(e) = self.persist() {
                tracing::warn!("boundary record for '{}' kept in memory only: {}", canonical_name, e);
            }
        }
        self.boundaries
            .get(canonical_name)
            .ok_or_else(|| LocationError::NotFound(canonical_name.to_string()))
    }

    /// Parsed shape, memoized per canonical name.
    pub fn parsed_geometry(&mut self, canonical_name: &str) -> Result<Arc<MultiPolygon<f64>>, LocationError> {
        if let Some(shape) = self.shapes.get(canonical_name) {
            return Ok(Arc::clone(shape));
        }
        let shape = match self.lookup_raw(canonical_name)?.geometry.to_shape() {
            Ok(shape) => Arc::new(shape),
            Err(e) => {
                tracing::error!("stored geometry for '{}' is malformed: {}", canonical_name, e);
                return Err(e);
            }
        };
        self.shapes.insert(canonical_name.to_string(), Arc::clone(&shape));
        Ok(shape)
    }

    pub fn bounding_box(&mut self, canonical_name: &str) -> Result<BoundingBox, LocationError> {
        let shape = self.parsed_geometry(canonical_name)?;
        BoundingBox::of_shape(&shape).ok_or_else(|| LocationError::NotFound(canonical_name.to_string()))
    }

    /// Centroid as `(lat, lon)`.
    pub fn centroid(&mut self, canonical_name: &str) -> Result<Center, LocationError> {
        let shape = self.parsed_geometry(canonical_name)?;
        Center::of_shape(&shape).ok_or_else(|| LocationError::NotFound(canonical_name.to_string()))
    }

    pub fn contains_point(&mut self, canonical_name: &str, lat: f64, lon: f64) -> Result<bool, LocationError> {
        let shape = self.parsed_geometry(canonical_name)?;
        Ok(shape_contains(&shape, lat, lon))
    }

    pub fn get_risk_zones(&mut self, canonical_name: &str, hazard_kind: &str) -> Result<Vec<RiskZone>, LocationError> {
        let record = self.lookup_raw(canonical_name)?;
        Ok(record.risk_zones.get(hazard_kind).cloned().unwrap_or_default())
    }

    /// Append a named zone under `hazard_kind` and persist. The ring is closed
    /// if needed and must describe a valid polygon.
    pub fn add_risk_zone(
        &mut self,
        canonical_name: &str,
        hazard_kind: &str,
        zone_name: &str,
        ring: Ring,
    ) -> Result<(), LocationError> {
        let geometry = Geometry::polygon(ring);
        geometry.to_shape()?;

        self.lookup_raw(canonical_name)?;
        let record = self
            .boundaries
            .get_mut(canonical_name)
            .ok_or_else(|| LocationError::NotFound(canonical_name.to_string()))?;
        record
            .risk_zones
            .entry(hazard_kind.to_string())
            .or_default()
            .push(RiskZone {
                name: zone_name.to_string(),
                geometry,
            });
        tracing::info!("added {} risk zone '{}' to {}", hazard_kind, zone_name, canonical_name);
        self.persist()
    }

    /// Drop memoized shapes. Boundary records are untouched.
    pub fn clear_shapes(&mut self) {
        self.shapes.clear();
    }

    fn seed_default_risk_zones(&mut self) {
        if self.reference.get(SEEDED_COUNTRY).is_none() {
            return;
        }
        let has_zones = self
            .boundaries
            .get(SEEDED_COUNTRY)
            .is_some_and(|r| !r.risk_zones.is_empty());
        if has_zones {
            return;
        }
        if self.lookup_raw(SEEDED_COUNTRY).is_err() {
            return;
        }
        if let Some(record) = self.boundaries.get_mut(SEEDED_COUNTRY) {
            record.risk_zones = example_risk_zones();
        }
        if self.reference.is_degraded() {
            return;
        }
        if let Err(e) = self.persist() {
            tracing::warn!("seeded risk zones not persisted: {}", e);
        }
    }

    /// Swap placeholder geometry for the real boundary. Risk zones are kept.
    fn upgrade_placeholder_records(&mut self) {
        if self.reference.is_degraded() {
            return;
        }
        let mut upgraded = 0;
        for (name, record) in self.boundaries.iter_mut().filter(|(_, r)| r.placeholder) {
            let Some(country) = self.reference.get(name) else { continue };
            record.geometry = country.geometry.clone();
            record.iso = country.iso.clone();
            record.placeholder = false;
            upgraded += 1;
        }
        if upgraded == 0 {
            return;
        }
        tracing::info!("replaced {} placeholder boundary record(s) with reference geometry", upgraded);
        if let Err(e) = self.persist() {
            tracing::warn!("upgraded boundary records not persisted: {}", e);
        }
    }

    fn persist(&self) -> Result<(), LocationError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| LocationError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(&self.boundaries)
            .map_err(|e| LocationError::Storage(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| {
            tracing::error!("cannot write {}: {}", self.path.display(), e);
            LocationError::Storage(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn read_boundaries(path: &Path) -> Result<BTreeMap<String, BoundaryRecord>, LocationError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let data = fs::read_to_string(path)
        .map_err(|e| LocationError::Storage(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| LocationError::Storage(format!("corrupt boundary dataset {}: {}", path.display(), e)))
}

fn zone(name: &str, min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> RiskZone {
    RiskZone {
        name: name.to_string(),
        geometry: Geometry::polygon(vec![
            vec![min_lon, min_lat],
            vec![max_lon, min_lat],
            vec![max_lon, max_lat],
            vec![min_lon, max_lat],
        ]),
    }
}

fn example_risk_zones() -> RiskZones {
    let mut zones = RiskZones::new();
    zones.insert(
        "earthquake".into(),
        vec![
            zone("Himalayan Region", 75.0, 30.0, 80.0, 35.0),
            zone("Western Coast", 72.0, 15.0, 75.0, 20.0),
        ],
    );
    zones.insert(
        "flood".into(),
        vec![
            zone("Ganges Basin", 80.0, 20.0, 85.0, 25.0),
            zone("Brahmaputra Basin", 90.0, 25.0, 95.0, 30.0),
        ],
    );
    zones.insert(
        "cyclone".into(),
        vec![
            zone("Eastern Coast", 80.0, 10.0, 85.0, 15.0),
            zone("Western Coast", 72.0, 15.0, 75.0, 20.0),
        ],
    );
    zones
}
