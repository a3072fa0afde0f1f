//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::geometry::{Center, Geometry};

/// Coarse place type supplied alongside a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Country,
    State,
    City,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::State => "state",
            Self::City => "city",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationKind {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(Self::Country),
            "state" | "region" | "province" => Ok(Self::State),
            "city" | "town" => Ok(Self::City),
            other => Err(LocationError::UnsupportedType(other.to_string())),
        }
    }
}

/// Location resolution errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("Location not found: '{0}'")]
    NotFound(String),
    #[error("Geocoder timed out: {0}")]
    GeocoderTimeout(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
    #[error("Malformed geometry: {0}")]
    GeometryParse(String),
    #[error("Reference dataset unavailable: {0}")]
    DataUnavailable(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Unsupported location type: '{0}'")]
    UnsupportedType(String),
}

impl LocationError {
    /// Internal invariant violations, as opposed to user-input failures.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::GeometryParse(_) | Self::DataUnavailable(_) | Self::Storage(_)
        )
    }
}

/// A named sub-polygon of a country associated with one hazard kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskZone {
    pub name: String,
    pub geometry: Geometry,
}

/// Hazard kind → zones, in insertion order per kind.
pub type RiskZones = BTreeMap<String, Vec<RiskZone>>;

/// Persisted per-country record, keyed by canonical name in the boundary dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRecord {
    pub name: String,
    #[serde(default)]
    pub iso: String,
    pub geometry: Geometry,
    #[serde(default)]
    pub risk_zones: RiskZones,
    /// Geometry came from the degraded-mode placeholder and is replaced by
    /// the real boundary once a full reference dataset is loaded.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

/// The geocoder's raw answer for a city, kept next to the derived buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A successfully resolved place.
///
/// `iso` and `risk_zones` are set for countries only, `raw_location` for
/// cities only. State and city geometries are synthetic buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub name: String,
    pub geometry: Geometry,
    pub center: Center,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_zones: Option<RiskZones>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_location: Option<RawPoint>,
}

impl LocationRecord {
    pub fn country(name: &str, boundary: &BoundaryRecord, center: Center) -> Self {
        Self {
            kind: LocationKind::Country,
            name: name.to_string(),
            geometry: boundary.geometry.clone(),
            center,
            iso: Some(boundary.iso.clone()),
            risk_zones: Some(boundary.risk_zones.clone()),
            raw_location: None,
        }
    }

    pub fn state(name: &str, geometry: Geometry, center: Center) -> Self {
        Self {
            kind: LocationKind::State,
            name: name.to_string(),
            geometry,
            center,
            iso: None,
            risk_zones: None,
            raw_location: None,
        }
    }

    pub fn city(name: &str, geometry: Geometry, center: Center, raw: RawPoint) -> Self {
        Self {
            kind: LocationKind::City,
            name: name.to_string(),
            geometry,
            center,
            iso: None,
            risk_zones: None,
            raw_location: Some(raw),
        }
    }
}

/// Failure rendered as data for the chat pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: LocationKind,
    pub name: String,
    pub location: String,
    pub error: String,
    #[serde(skip)]
    pub cause: Option<LocationError>,
}

impl ErrorRecord {
    pub fn new(name: &str, kind: LocationKind, cause: LocationError) -> Self {
        let error = match &cause {
            LocationError::NotFound(_) => {
                format!("Could not find coordinates for {}: {}", kind, name)
            }
            other => format!("Could not get coordinates for {} ({}): {}", name, kind, other),
        };
        Self {
            kind,
            name: name.to_string(),
            location: name.to_string(),
            error,
            cause: Some(cause),
        }
    }
}

/// Outcome of `resolve`: callers must branch on it, geometry is never implied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resolution {
    Found(LocationRecord),
    Failed(ErrorRecord),
}

impl Resolution {
    pub fn record(&self) -> Option<&LocationRecord> {
        match self {
            Self::Found(r) => Some(r),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorRecord> {
        match self {
            Self::Found(_) => None,
            Self::Failed(e) => Some(e),
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Three-valued answer to "is this point in that place".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Containment {
    Inside,
    Outside,
    /// The place could not be resolved.
    Unknown,
}
