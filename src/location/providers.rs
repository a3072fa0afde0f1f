//! Geocoding providers: Nominatim over HTTP, and an offline stand-in.

use serde::Deserialize;
use std::time::Duration;

use super::types::LocationError;

/// Best single match for a free-text query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

/// Free-text query → single best point.
///
/// `Ok(None)` means the provider answered with no match. Transient timeouts
/// are reported as `LocationError::GeocoderTimeout` so callers can retry.
pub trait Geocoder: Send {
    fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, LocationError>;
}

// ─── Nominatim provider ─────────────────────────────────────────

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
}

pub struct NominatimGeocoder {
    agent: ureq::Agent,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Geocoder for NominatimGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, LocationError> {
        let url = format!(
            "{}/search?q={}&format=json&limit=1&addressdetails=0",
            self.base_url,
            urlencod(query),
        );

        let response = self.agent.get(&url).call().map_err(|e| classify(query, e))?;

        let results: Vec<NominatimResult> = response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        let Some(top) = results.into_iter().next() else {
            return Ok(None);
        };
        let lat: f64 = top
            .lat
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad latitude '{}'", top.lat)))?;
        let lon: f64 = top
            .lon
            .parse()
            .map_err(|_| LocationError::InvalidResponse(format!("bad longitude '{}'", top.lon)))?;

        Ok(Some(GeocodeHit {
            address: top.display_name,
            lat,
            lon,
        }))
    }
}

/// I/O-level transport failures (read/connect timeouts) are the retryable kind.
fn classify(query: &str, err: ureq::Error) -> LocationError {
    match err {
        ureq::Error::Transport(t) if matches!(t.kind(), ureq::ErrorKind::Io) => {
            LocationError::GeocoderTimeout(format!("'{}': {}", query, t))
        }
        other => LocationError::Network(other.to_string()),
    }
}

/// Never finds anything. Used with `--offline`.
pub struct OfflineGeocoder;

impl Geocoder for OfflineGeocoder {
    fn geocode(&self, _query: &str) -> Result<Option<GeocodeHit>, LocationError> {
        Ok(None)
    }
}

// ─── URL encoding (minimal, no extra dep) ───────────────────────

fn urlencod(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
