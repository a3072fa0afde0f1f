//! Location resolver, the single entry point for place lookups.
//!
//! Country flow:    cache → name normalization → boundary store → record | error record
//! State/city flow: cache → geocoder + buffer polygon → record | error record
//!
//! Every outcome, failures included, is memoized per exact `(name, kind)`.
//! Not synchronized; share it behind a lock.

use std::sync::Arc;

use super::cache::{CacheStats, ResolutionCache};
use super::names::NameResolver;
use super::providers::{Geocoder, NominatimGeocoder, OfflineGeocoder};
use super::regions::{RegionGeocoder, RegionOptions};
use super::store::GeometryStore;
use super::types::{
    Containment, ErrorRecord, LocationError, LocationKind, LocationRecord, Resolution, RiskZone,
};
use crate::config::Config;
use crate::geometry::{containment, BoundingBox, Ring};

pub struct LocationResolver {
    store: GeometryStore,
    names: NameResolver,
    regions: RegionGeocoder,
    cache: ResolutionCache,
}

impl LocationResolver {
    pub fn new(
        store: GeometryStore,
        names: NameResolver,
        regions: RegionGeocoder,
        cache: ResolutionCache,
    ) -> Self {
        Self {
            store,
            names,
            regions,
            cache,
        }
    }

    /// Wire up the store, Nominatim (or the offline stand-in) and the cache from config.
    pub fn from_config(config: &Config) -> Result<Self, LocationError> {
        let store = GeometryStore::load(config)?;
        let names = NameResolver::new(config.fuzzy_cutoff).with_aliases(config.extra_aliases.clone());
        tracing::debug!("{} country aliases loaded", names.alias_count());
        let geocoder: Box<dyn Geocoder> = if config.offline {
            Box::new(OfflineGeocoder)
        } else {
            Box::new(NominatimGeocoder::new(
                &config.geocoder_url,
                &config.user_agent,
                config.geocoder_timeout(),
            ))
        };
        let regions = RegionGeocoder::new(geocoder, RegionOptions::from_config(config));
        Ok(Self::new(store, names, regions, ResolutionCache::new(config.cache_capacity)))
    }

    pub fn store(&self) -> &GeometryStore {
        &self.store
    }

    /// Canonical country name for free text. Unmatched input comes back unchanged.
    pub fn normalize(&self, name: &str) -> String {
        self.names.normalize(name, &self.store.canonical_names())
    }

    /// Resolve a place. Repeated calls with the same arguments return the
    /// same shared value, including cached failures.
    pub fn resolve(&mut self, name: &str, kind: LocationKind) -> Arc<Resolution> {
        if let Some(hit) = self.cache.get(name, kind) {
            tracing::debug!("cache hit for {} '{}'", kind, name);
            return hit;
        }

        let resolution = match self.resolve_uncached(name, kind) {
            Ok(record) => {
                tracing::debug!("resolved {} '{}' at {}", kind, name, record.center);
                Resolution::Found(record)
            }
            Err(e) => {
                if e.is_internal() {
                    tracing::error!("resolving {} '{}': {}", kind, name, e);
                } else {
                    tracing::info!("could not resolve {} '{}': {}", kind, name, e);
                }
                Resolution::Failed(ErrorRecord::new(name, kind, e))
            }
        };
        self.cache.insert(name, kind, resolution)
    }

    fn resolve_uncached(&mut self, name: &str, kind: LocationKind) -> Result<LocationRecord, LocationError> {
        match kind {
            LocationKind::Country => {
                let canonical = self.normalize(name);
                let boundary = self.store.lookup_raw(&canonical)?.clone();
                let center = self.store.centroid(&canonical)?;
                Ok(LocationRecord::country(name, &boundary, center))
            }
            LocationKind::State => self.regions.resolve_state(name),
            LocationKind::City => {
                let record = self.regions.resolve_city(name)?;
                self.check_default_country(&record);
                Ok(record)
            }
        }
    }

    /// Log, never fail, when a city lands outside the configured default country.
    fn check_default_country(&mut self, record: &LocationRecord) {
        let country = self.regions.options().default_country.clone();
        if country.is_empty() {
            return;
        }
        let canonical = self.normalize(&country);
        match self
            .store
            .contains_point(&canonical, record.center.lat, record.center.lon)
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                "city {} coordinates ({}) appear to be outside {}",
                record.name,
                record.center,
                country
            ),
            Err(e) => tracing::debug!("skipping {} sanity check for {}: {}", country, record.name, e),
        }
    }

    /// Containment with "could not resolve" kept distinct from "outside".
    pub fn containment(&mut self, lat: f64, lon: f64, name: &str, kind: LocationKind) -> Containment {
        match kind {
            LocationKind::Country => {
                let canonical = self.normalize(name);
                match self.store.contains_point(&canonical, lat, lon) {
                    Ok(true) => Containment::Inside,
                    Ok(false) => Containment::Outside,
                    Err(e) => {
                        tracing::debug!("containment unknown for country '{}': {}", name, e);
                        Containment::Unknown
                    }
                }
            }
            LocationKind::State | LocationKind::City => match self.resolve(name, kind).record() {
                Some(record) if containment::contains(&record.geometry, lat, lon) => Containment::Inside,
                Some(_) => Containment::Outside,
                None => Containment::Unknown,
            },
        }
    }

    /// `true` only when the point is known to be inside. An unresolvable
    /// place yields `false`; use [`containment`](Self::containment) to tell
    /// the two apart.
    pub fn is_point_in_location(&mut self, lat: f64, lon: f64, name: &str, kind: LocationKind) -> bool {
        self.containment(lat, lon, name, kind) == Containment::Inside
    }

    pub fn bounding_box(&mut self, country: &str) -> Result<BoundingBox, LocationError> {
        let canonical = self.normalize(country);
        self.store.bounding_box(&canonical)
    }

    pub fn get_risk_zones(&mut self, country: &str, hazard_kind: &str) -> Result<Vec<RiskZone>, LocationError> {
        let canonical = self.normalize(country);
        self.store.get_risk_zones(&canonical, hazard_kind)
    }

    /// Persist a new zone. Country records already cached keep the zones
    /// they were resolved with until invalidated.
    pub fn add_risk_zone(
        &mut self,
        country: &str,
        hazard_kind: &str,
        zone_name: &str,
        ring: Ring,
    ) -> Result<(), LocationError> {
        let canonical = self.normalize(country);
        self.store.add_risk_zone(&canonical, hazard_kind, zone_name, ring)
    }

    pub fn invalidate(&mut self, name: &str, kind: LocationKind) -> bool {
        self.cache.invalidate(name, kind)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        self.store.clear_shapes();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::reference::ReferenceDataset;
    use crate::location::regions::tests::StubGeocoder;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
      "type": "FeatureCollection",
      "features": [
        {"type": "Feature", "properties": {"NAME": "India", "ISO_A2": "IN"},
         "geometry": {"type": "Polygon", "coordinates": [[[68.2,8.0],[97.3,8.0],[97.3,35.5],[68.2,35.5],[68.2,8.0]]]}},
        {"type": "Feature", "properties": {"NAME": "United States of America", "ISO_A2": "US"},
         "geometry": {"type": "Polygon", "coordinates": [[[-125,25],[-67,25],[-67,49],[-125,49],[-125,25]]]}}
      ]
    }"#;

    fn test_resolver(stub: StubGeocoder) -> (LocationResolver, TempDir) {
        let dir = TempDir::new().unwrap();
        let reference = ReferenceDataset::parse(SAMPLE).unwrap();
        let store = GeometryStore::open(dir.path().join("boundaries.json"), reference).unwrap();
        let opts = RegionOptions {
            retry_backoff: Duration::from_millis(1),
            ..RegionOptions::default()
        };
        let regions = RegionGeocoder::new(Box::new(stub), opts);
        let resolver = LocationResolver::new(
            store,
            NameResolver::default(),
            regions,
            ResolutionCache::unbounded(),
        );
        (resolver, dir)
    }

    #[test]
    fn test_resolve_country() {
        let (mut resolver, _dir) = test_resolver(StubGeocoder::default());
        let res = resolver.resolve("India", LocationKind::Country);
        let rec = res.record().unwrap();
        assert_eq!(rec.kind, LocationKind::Country);
        assert_eq!(rec.name, "India");
        assert_eq!(rec.iso.as_deref(), Some("IN"));
        assert!(rec.risk_zones.as_ref().unwrap().contains_key("earthquake"));
        assert!((68.0..=97.0).contains(&rec.center.lon));
        assert!((7.0..=36.0).contains(&rec.center.lat));
    }

    #[test]
    fn test_resolve_country_alias_keeps_supplied_name() {
        let (mut resolver, _dir) = test_resolver(StubGeocoder::default());
        let res = resolver.resolve("usa", LocationKind::Country);
        let rec = res.record().unwrap();
        assert_eq!(rec.name, "usa");
        assert_eq!(rec.iso.as_deref(), Some("US"));
    }

    #[test]
    fn test_unknown_country_is_error_record() {
        let (mut resolver, _dir) = test_resolver(StubGeocoder::default());
        let res = resolver.resolve("UnknownCountryXYZ", LocationKind::Country);
        let err = res.error().unwrap();
        assert_eq!(err.error, "Could not find coordinates for country: UnknownCountryXYZ");
        assert_eq!(err.kind, LocationKind::Country);
    }

    #[test]
    fn test_memoized_city_is_same_value() {
        let stub = StubGeocoder::default().with("Mumbai, India", 19.0760, 72.8777);
        let calls = Arc::clone(&stub.calls);
        let (mut resolver, _dir) = test_resolver(stub);

        let first = resolver.resolve("Mumbai", LocationKind::City);
        let second = resolver.resolve("Mumbai", LocationKind::City);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let center = first.record().unwrap().center;
        assert!((center.lat - 19.07).abs() < 0.1 && (center.lon - 72.87).abs() < 0.1);
    }

    #[test]
    fn test_failures_are_memoized_until_invalidated() {
        let stub = StubGeocoder::default();
        let calls = Arc::clone(&stub.calls);
        let (mut resolver, _dir) = test_resolver(stub);

        assert!(resolver.resolve("Atlantis", LocationKind::State).error().is_some());
        assert!(resolver.resolve("Atlantis", LocationKind::State).error().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(resolver.invalidate("Atlantis", LocationKind::State));
        resolver.resolve("Atlantis", LocationKind::State);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_exhausted_timeout_becomes_error_record() {
        let stub = StubGeocoder::default().timing_out("Kerala", 10);
        let (mut resolver, _dir) = test_resolver(stub);
        let res = resolver.resolve("Kerala", LocationKind::State);
        let err = res.error().unwrap();
        assert!(matches!(err.cause, Some(LocationError::GeocoderTimeout(_))));
        assert_eq!(err.location, "Kerala");
    }

    #[test]
    fn test_point_in_country() {
        let (mut resolver, _dir) = test_resolver(StubGeocoder::default());
        assert!(resolver.is_point_in_location(20.5937, 78.9629, "India", LocationKind::Country));
        assert!(!resolver.is_point_in_location(35.8617, 104.1954, "India", LocationKind::Country));
        assert!(resolver.is_point_in_location(39.0, -98.0, "US", LocationKind::Country));
    }

    #[test]
    fn test_containment_three_valued() {
        let stub = StubGeocoder::default().with("California", 36.78, -119.42);
        let (mut resolver, _dir) = test_resolver(stub);

        assert_eq!(resolver.containment(36.78, -119.42, "California", LocationKind::State), Containment::Inside);
        assert_eq!(resolver.containment(40.0, -119.42, "California", LocationKind::State), Containment::Outside);
        assert_eq!(resolver.containment(0.0, 0.0, "Nowhere", LocationKind::City), Containment::Unknown);
        assert_eq!(resolver.containment(0.0, 0.0, "Atlantis", LocationKind::Country), Containment::Unknown);
        assert!(!resolver.is_point_in_location(0.0, 0.0, "Atlantis", LocationKind::Country));
    }

    #[test]
    fn test_bounding_box_and_zones_via_alias() {
        let (mut resolver, _dir) = test_resolver(StubGeocoder::default());
        let bbox = resolver.bounding_box("Bharat").unwrap();
        assert!(bbox.min_lon < bbox.max_lon && bbox.min_lat < bbox.max_lat);
        assert!(bbox.min_lon >= 60.0 && bbox.max_lon <= 100.0);

        let ring = vec![vec![-120.0, 35.0], vec![-118.0, 35.0], vec![-118.0, 37.0]];
        resolver.add_risk_zone("usa", "wildfire", "Sierra Foothills", ring).unwrap();
        let zones = resolver.get_risk_zones("United States of America", "wildfire").unwrap();
        assert!(zones.iter().any(|z| z.name == "Sierra Foothills"));
    }

    #[test]
    fn test_clear_cache() {
        let (mut resolver, _dir) = test_resolver(StubGeocoder::default());
        resolver.resolve("India", LocationKind::Country);
        assert_eq!(resolver.cache_stats().entries, 1);
        resolver.clear_cache();
        assert_eq!(resolver.cache_stats().entries, 0);
    }
}
