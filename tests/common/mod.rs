#![allow(dead_code)]

use disaster_geo::config::Config;
use disaster_geo::location::{
    GeocodeHit, Geocoder, GeometryStore, LocationError, LocationResolver, NameResolver,
    ReferenceDataset, RegionGeocoder, RegionOptions, ResolutionCache,
};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Coarse outlines: enough shape to tell the countries apart.
pub const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"NAME": "India", "ISO_A2": "IN"},
     "geometry": {"type": "Polygon", "coordinates": [[
        [68.0, 23.0], [72.0, 8.0], [80.0, 8.0], [92.0, 21.0], [97.0, 28.0],
        [88.0, 26.0], [80.0, 30.0], [75.0, 35.0], [68.0, 23.0]]]}},
    {"type": "Feature", "properties": {"NAME": "China", "ISO_A2": "CN"},
     "geometry": {"type": "Polygon", "coordinates": [[
        [98.0, 22.0], [134.0, 22.0], [134.0, 53.0], [74.0, 53.0], [74.0, 37.0], [98.0, 22.0]]]}},
    {"type": "Feature", "properties": {"NAME": "Nepal", "ISO_A2": "NP"},
     "geometry": {"type": "MultiPolygon", "coordinates": [[[
        [80.0, 26.4], [88.2, 26.4], [88.2, 30.4], [80.0, 30.4], [80.0, 26.4]]]]}},
    {"type": "Feature", "properties": {"NAME": "Niger", "ISO_A2": "NE"},
     "geometry": {"type": "Polygon", "coordinates": [[
        [0.2, 12.0], [16.0, 12.0], [16.0, 23.5], [0.2, 23.5], [0.2, 12.0]]]}},
    {"type": "Feature", "properties": {"NAME": "Nigeria", "ISO_A2": "NG"},
     "geometry": {"type": "Polygon", "coordinates": [[
        [2.7, 4.3], [14.6, 4.3], [14.6, 11.9], [2.7, 11.9], [2.7, 4.3]]]}},
    {"type": "Feature", "properties": {"NAME": "Nowhere Land", "ISO_A2": "-99"},
     "geometry": null},
    {"type": "Feature", "properties": {"NAME": "Brokenland", "ISO_A2": "BL"},
     "geometry": {"type": "Polygon", "coordinates": [[[10.0, 10.0], [11.0, 11.0]]]}}
  ]
}"#;

/// Geocoder answering from a fixed table; counts every call.
#[derive(Clone, Default)]
pub struct TableGeocoder {
    hits: HashMap<String, (f64, f64)>,
    timeouts: HashSet<String>,
    pub calls: Arc<AtomicUsize>,
}

impl TableGeocoder {
    pub fn with(mut self, query: &str, lat: f64, lon: f64) -> Self {
        self.hits.insert(query.to_string(), (lat, lon));
        self
    }

    /// Every lookup of `query` times out.
    pub fn timing_out(mut self, query: &str) -> Self {
        self.timeouts.insert(query.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Geocoder for TableGeocoder {
    fn geocode(&self, query: &str) -> Result<Option<GeocodeHit>, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.timeouts.contains(query) {
            return Err(LocationError::GeocoderTimeout(query.to_string()));
        }
        Ok(self.hits.get(query).map(|&(lat, lon)| GeocodeHit {
            address: format!("{}, Earth", query),
            lat,
            lon,
        }))
    }
}

pub fn default_geocoder() -> TableGeocoder {
    TableGeocoder::default()
        .with("Mumbai, India", 19.0760, 72.8777)
        .with("Kathmandu, India", 27.7172, 85.3240)
        .with("Maharashtra", 19.7515, 75.7139)
        .timing_out("Kerala")
}

/// Offline config rooted at `dir` with the fixture written as the cached
/// reference dataset.
pub fn fixture_config(dir: &Path) -> Config {
    let config = Config {
        data_dir: dir.to_path_buf(),
        offline: true,
        retry_backoff_ms: 1,
        ..Config::default()
    };
    fs::write(config.reference_path(), FIXTURE).unwrap();
    config
}

pub fn resolver_with(dir: &Path, geocoder: TableGeocoder) -> LocationResolver {
    let config = fixture_config(dir);
    let reference = ReferenceDataset::parse(FIXTURE).unwrap();
    let store = GeometryStore::open(config.boundaries_path(), reference).unwrap();
    LocationResolver::new(
        store,
        NameResolver::default(),
        RegionGeocoder::new(Box::new(geocoder), RegionOptions::from_config(&config)),
        ResolutionCache::unbounded(),
    )
}
