//! Location subsystem for the disaster assistant.
//!
//! Resolves free-text place names to country boundaries or synthetic
//! state/city buffers, caches the results, and answers point-in-region
//! and risk-zone queries.

pub mod cache;
pub mod names;
pub mod providers;
pub mod reference;
pub mod regions;
pub mod resolver;
pub mod store;
pub mod types;

pub use cache::{CacheStats, ResolutionCache};
pub use names::NameResolver;
pub use providers::{GeocodeHit, Geocoder, NominatimGeocoder, OfflineGeocoder};
pub use reference::ReferenceDataset;
pub use regions::{RegionGeocoder, RegionOptions};
pub use resolver::LocationResolver;
pub use store::GeometryStore;
pub use types::{
    Containment, ErrorRecord, LocationError, LocationKind, LocationRecord, Resolution, RiskZone,
};
