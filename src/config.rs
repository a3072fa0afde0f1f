//! Runtime configuration.
//!
//! Layering, later wins: built-in defaults, JSON file, `DISASTER_GEO_*`
//! environment variables, then CLI flags (applied by the binary).

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::location::names::DEFAULT_FUZZY_CUTOFF;

pub const NATURAL_EARTH_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson/ne_110m_admin_0_countries.geojson";
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

const BOUNDARIES_FILE: &str = "country_boundaries.json";
const REFERENCE_FILE: &str = "ne_110m_admin_0_countries.geojson";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub reference_url: String,
    pub geocoder_url: String,
    pub user_agent: String,
    pub geocoder_timeout_secs: u64,
    pub retry_backoff_ms: u64,
    /// Appended to city queries and used for the city sanity check.
    pub default_country: String,
    pub state_half_width_deg: f64,
    pub city_radius_deg: f64,
    pub city_segments: usize,
    pub fuzzy_cutoff: f64,
    /// Lower-cased alias → canonical country name, merged over the built-in table.
    pub extra_aliases: BTreeMap<String, String>,
    /// `None` keeps every resolution for the process lifetime.
    pub cache_capacity: Option<usize>,
    pub listen_addr: String,
    /// Skip all network calls.
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            reference_url: NATURAL_EARTH_URL.to_string(),
            geocoder_url: NOMINATIM_URL.to_string(),
            user_agent: format!("disaster-geo/{}", env!("CARGO_PKG_VERSION")),
            geocoder_timeout_secs: 10,
            retry_backoff_ms: 1000,
            default_country: "India".to_string(),
            state_half_width_deg: 0.5,
            city_radius_deg: 0.1,
            city_segments: 32,
            fuzzy_cutoff: DEFAULT_FUZZY_CUTOFF,
            extra_aliases: BTreeMap::new(),
            cache_capacity: None,
            listen_addr: "127.0.0.1:8080".to_string(),
            offline: false,
        }
    }
}

impl Config {
    pub fn boundaries_path(&self) -> PathBuf {
        self.data_dir.join(BOUNDARIES_FILE)
    }

    pub fn reference_path(&self) -> PathBuf {
        self.data_dir.join(REFERENCE_FILE)
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// `<platform data dir>/disaster-geo`, or `./data` when there is none.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("disaster-geo"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Load configuration from `path` (or `<default data dir>/config.json` if it
/// exists), then apply environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut cfg = match path {
        Some(p) => read_file(p)?,
        None => {
            let p = default_data_dir().join(CONFIG_FILE);
            if p.exists() {
                read_file(&p)?
            } else {
                Config::default()
            }
        }
    };
    apply_env(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

fn read_file(path: &Path) -> anyhow::Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing config file {}", path.display()))
}

fn apply_env(cfg: &mut Config, get: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
    if let Some(v) = get("DISASTER_GEO_DATA_DIR") {
        cfg.data_dir = PathBuf::from(v);
    }
    if let Some(v) = get("DISASTER_GEO_REFERENCE_URL") {
        cfg.reference_url = v;
    }
    if let Some(v) = get("DISASTER_GEO_GEOCODER_URL") {
        cfg.geocoder_url = v;
    }
    if let Some(v) = get("DISASTER_GEO_DEFAULT_COUNTRY") {
        cfg.default_country = v;
    }
    if let Some(v) = get("DISASTER_GEO_LISTEN_ADDR") {
        cfg.listen_addr = v;
    }
    if let Some(v) = get("DISASTER_GEO_GEOCODER_TIMEOUT_SECS") {
        cfg.geocoder_timeout_secs = v
            .parse()
            .with_context(|| format!("DISASTER_GEO_GEOCODER_TIMEOUT_SECS={}", v))?;
    }
    if let Some(v) = get("DISASTER_GEO_FUZZY_CUTOFF") {
        cfg.fuzzy_cutoff = v
            .parse()
            .with_context(|| format!("DISASTER_GEO_FUZZY_CUTOFF={}", v))?;
    }
    if let Some(v) = get("DISASTER_GEO_CACHE_CAPACITY") {
        cfg.cache_capacity = Some(
            v.parse()
                .with_context(|| format!("DISASTER_GEO_CACHE_CAPACITY={}", v))?,
        );
    }
    if let Some(v) = get("DISASTER_GEO_OFFLINE") {
        cfg.offline = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes");
    }
    Ok(())
}
