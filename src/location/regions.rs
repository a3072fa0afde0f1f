//! State and city resolution via a geocoder plus synthetic buffer polygons.
//!
//! States get a square of `state_half_width` degrees around the geocoded
//! point, cities a `city_segments`-gon of `city_radius` degrees. Neither is an
//! administrative boundary.

use std::time::Duration;

use super::providers::{GeocodeHit, Geocoder};
use super::types::{LocationError, LocationRecord, RawPoint};
use crate::config::Config;
use crate::geometry::{buffer, Center};

#[derive(Debug, Clone)]
pub struct RegionOptions {
    /// Appended to city queries to bias ambiguous names.
    pub default_country: String,
    pub state_half_width: f64,
    pub city_radius: f64,
    pub city_segments: usize,
    pub retry_backoff: Duration,
}

impl RegionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_country: config.default_country.clone(),
            state_half_width: config.state_half_width_deg,
            city_radius: config.city_radius_deg,
            city_segments: config.city_segments,
            retry_backoff: config.retry_backoff(),
        }
    }
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct RegionGeocoder {
    geocoder: Box<dyn Geocoder>,
    opts: RegionOptions,
}

impl RegionGeocoder {
    pub fn new(geocoder: Box<dyn Geocoder>, opts: RegionOptions) -> Self {
        Self { geocoder, opts }
    }

    pub fn options(&self) -> &RegionOptions {
        &self.opts
    }

    /// Geocode the bare state name and wrap it in a rectangular buffer.
    pub fn resolve_state(&self, name: &str) -> Result<LocationRecord, LocationError> {
        let hit = self
            .lookup(name)?
            .ok_or_else(|| LocationError::NotFound(name.to_string()))?;
        let geometry = buffer::rectangle(hit.lat, hit.lon, self.opts.state_half_width);
        Ok(LocationRecord::state(name, geometry, Center::new(hit.lat, hit.lon)))
    }

    /// Geocode "<name>, <default country>" and wrap it in a circular buffer.
    pub fn resolve_city(&self, name: &str) -> Result<LocationRecord, LocationError> {
        let query = if self.opts.default_country.is_empty() {
            name.to_string()
        } else {
            format!("{}, {}", name, self.opts.default_country)
        };
        let hit = self
            .lookup(&query)?
            .ok_or_else(|| LocationError::NotFound(name.to_string()))?;
        let geometry = buffer::circle(hit.lat, hit.lon, self.opts.city_radius, self.opts.city_segments);
        let raw = RawPoint {
            address: hit.address,
            latitude: hit.lat,
            longitude: hit.lon,
        };
        Ok(LocationRecord::city(name, geometry, Center::new(hit.lat, hit.lon), raw))
    }

    /// One retry after `retry_backoff`, only on timeout.
    fn lookup(&self, query: &str) -> Result<Option<GeocodeHit>, LocationError> {
        match self.geocoder.geocode(query) {
            Err(LocationError::GeocoderTimeout(msg)) => {
                tracing::warn!(
                    "geocoder timed out for '{}' ({}), retrying in {:?}",
                    query,
                    msg,
                    self.opts.retry_backoff
                );
                std::thread::sleep(self.opts.retry_backoff);
                self.geocoder.geocode(query)
            }
            other => other,
        }
    }
}
