//! Admin-0 reference boundaries (Natural Earth GeoJSON FeatureCollection).
//!
//! Flow: local copy → one remote fetch (persisted on success) → built-in
//! single-country placeholder (degraded mode, never persisted).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::types::LocationError;
use crate::geometry::Geometry;

/// India's bounding box as a polygon. Enough to keep the system operable.
const PLACEHOLDER_JSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [{
    "type": "Feature",
    "properties": {"NAME": "India", "ISO_A2": "IN"},
    "geometry": {
      "type": "Polygon",
      "coordinates": [[[68.1766451354, 7.96553477623], [97.34882107351, 7.96553477623],
                       [97.34882107351, 35.4940095078], [68.1766451354, 35.4940095078],
                       [68.1766451354, 7.96553477623]]]
    }
  }]
}"#;

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    #[serde(default)]
    geometry: Option<serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct Properties {
    #[serde(rename = "NAME")]
    name: Option<String>,
    #[serde(rename = "ISO_A2")]
    iso_a2: Option<String>,
}

/// One country from the reference dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCountry {
    pub name: String,
    pub iso: String,
    pub geometry: Geometry,
}

/// Reference countries keyed by their exact `NAME`.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDataset {
    countries: BTreeMap<String, ReferenceCountry>,
    degraded: bool,
}

impl ReferenceDataset {
    /// Parse a FeatureCollection. Features without a name or with a
    /// non-polygonal geometry are skipped.
    pub fn parse(json: &str) -> Result<Self, LocationError> {
        let collection: FeatureCollection = serde_json::from_str(json)
            .map_err(|e| LocationError::DataUnavailable(format!("bad FeatureCollection: {}", e)))?;

        let mut countries = BTreeMap::new();
        for feature in collection.features {
            let Some(name) = feature.properties.name else { continue };
            let Some(raw) = feature.geometry else {
                tracing::debug!("reference feature '{}' has no geometry", name);
                continue;
            };
            match serde_json::from_value::<Geometry>(raw) {
                Ok(geometry) => {
                    let iso = feature.properties.iso_a2.unwrap_or_default();
                    countries.insert(name.clone(), ReferenceCountry { name, iso, geometry });
                }
                Err(e) => tracing::warn!("skipping reference feature '{}': {}", name, e),
            }
        }
        Ok(Self { countries, degraded: false })
    }

    pub fn placeholder() -> Result<Self, LocationError> {
        let mut dataset = Self::parse(PLACEHOLDER_JSON)?;
        dataset.degraded = true;
        Ok(dataset)
    }

    /// Read `path`, or fetch `url` into `path` when the file is missing.
    /// Falls back to the placeholder when both fail.
    pub fn load_or_fetch(
        path: &Path,
        url: &str,
        user_agent: &str,
        timeout: Duration,
        offline: bool,
    ) -> Result<Self, LocationError> {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match Self::parse(&data) {
                    Ok(dataset) if !dataset.is_empty() => return Ok(dataset),
                    Ok(_) => tracing::warn!("reference dataset {} has no countries", path.display()),
                    Err(e) => tracing::warn!("reference dataset {} unreadable: {}", path.display(), e),
                },
                Err(e) => tracing::warn!("cannot read {}: {}", path.display(), e),
            }
        }

        if !offline {
            match fetch(url, user_agent, timeout).and_then(|body| Ok((Self::parse(&body)?, body))) {
                Ok((dataset, body)) if !dataset.is_empty() => {
                    if let Some(parent) = path.parent() {
                        let _ = fs::create_dir_all(parent);
                    }
                    match fs::write(path, body) {
                        Ok(()) => tracing::info!("downloaded reference boundaries to {}", path.display()),
                        Err(e) => tracing::warn!("cannot save reference boundaries: {}", e),
                    }
                    return Ok(dataset);
                }
                Ok(_) => tracing::error!("reference dataset at {} has no countries", url),
                Err(e) => tracing::error!("error downloading reference boundaries: {}", e),
            }
        }

        tracing::warn!("using single-country placeholder boundaries (degraded mode)");
        Self::placeholder()
    }

    /// Exact, case-sensitive lookup by `NAME`.
    pub fn get(&self, name: &str) -> Option<&ReferenceCountry> {
        self.countries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.countries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    /// True when running on the built-in placeholder.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

fn fetch(url: &str, user_agent: &str, timeout: Duration) -> Result<String, LocationError> {
    let response = ureq::get(url)
        .set("User-Agent", user_agent)
        .timeout(timeout)
        .call()
        .map_err(|e| LocationError::Network(e.to_string()))?;

    response
        .into_string()
        .map_err(|e| LocationError::InvalidResponse(e.to_string()))
}
