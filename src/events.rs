//! Hazard events and the region filtering done before they reach a user.
//!
//! Upstream feeds (USGS FDSN for earthquakes) are queried with a coarse
//! region, a bounding box or a radius around a city, and the results are then
//! cut down to the resolved geometry, ranked by magnitude and truncated.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::containment::{self, Located};
use crate::geometry::{BoundingBox, Center};
use crate::location::types::{LocationError, LocationKind, LocationRecord};

/// Search radius used for city-level upstream queries.
pub const CITY_QUERY_RADIUS_KM: f64 = 100.0;

/// Longest "next N days" window accepted from a period phrase.
pub const MAX_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardEvent {
    pub id: String,
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
    pub depth_km: Option<f64>,
    pub magnitude: Option<f64>,
    pub time: DateTime<Utc>,
    pub place: Option<String>,
    pub url: Option<String>,
}

impl Located for HazardEvent {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

// ─── USGS GeoJSON feed ──────────────────────────────────────────

#[derive(Deserialize)]
struct UsgsCollection {
    #[serde(default)]
    features: Vec<UsgsFeature>,
}

#[derive(Deserialize)]
struct UsgsFeature {
    #[serde(default)]
    id: String,
    properties: UsgsProperties,
    geometry: Option<UsgsPoint>,
}

#[derive(Deserialize)]
struct UsgsProperties {
    mag: Option<f64>,
    place: Option<String>,
    /// Milliseconds since the epoch.
    time: Option<i64>,
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct UsgsPoint {
    coordinates: Vec<f64>,
}

/// Parse a USGS FDSN `format=geojson` response. Features without a point or
/// a timestamp are skipped.
pub fn parse_usgs_events(json: &str) -> Result<Vec<HazardEvent>, LocationError> {
    let collection: UsgsCollection =
        serde_json::from_str(json).map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

    let events = collection
        .features
        .into_iter()
        .filter_map(|f| {
            let coords = f.geometry?.coordinates;
            let (lon, lat) = (*coords.first()?, *coords.get(1)?);
            let time = Utc.timestamp_millis_opt(f.properties.time?).single()?;
            Some(HazardEvent {
                id: f.id,
                kind: f.properties.kind.unwrap_or_else(|| "earthquake".to_string()),
                lat,
                lon,
                depth_km: coords.get(2).copied(),
                magnitude: f.properties.mag,
                time,
                place: f.properties.place,
                url: f.properties.url,
            })
        })
        .collect();
    Ok(events)
}

// ─── Time window ────────────────────────────────────────────────

/// Inclusive `[start, end]` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn next_days(now: DateTime<Utc>, days: i64) -> Self {
        Self::new(now, now + Duration::days(days))
    }

    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self::new(now - Duration::days(days), now)
    }

    /// Build a window from phrases such as "next 10 days" or
    /// "from 2024-05-01 to 2024-05-10". Unparseable phrases and day counts
    /// outside `1..=MAX_WINDOW_DAYS` are ignored; the window defaults to the
    /// next 7 days.
    pub fn from_periods<S: AsRef<str>>(now: DateTime<Utc>, periods: &[S]) -> Self {
        let mut window = Self::next_days(now, 7);
        for period in periods {
            let period = period.as_ref().to_lowercase();
            let words: Vec<&str> = period.split_whitespace().collect();
            if words.contains(&"next") && period.contains("day") {
                let end = words
                    .iter()
                    .find_map(|w| w.parse::<i64>().ok())
                    .filter(|n| (1..=MAX_WINDOW_DAYS).contains(n))
                    .and_then(Duration::try_days)
                    .and_then(|d| now.checked_add_signed(d));
                match end {
                    Some(end) => window.end = end,
                    None => tracing::debug!("ignoring out-of-range period '{}'", period),
                }
            } else if words.contains(&"from") && words.contains(&"to") {
                let dates: Vec<DateTime<Utc>> = words.iter().filter_map(|w| parse_day(w)).collect();
                if let [start, end, ..] = dates.as_slice() {
                    window = Self::new(*start, *end);
                }
            }
        }
        window
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self::next_days(Utc::now(), 7)
    }
}

fn parse_day(s: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

// ─── Region query ───────────────────────────────────────────────

/// The coarse region handed to an upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum RegionQuery {
    Bbox { bounds: BoundingBox },
    Radius { center: Center, radius_km: f64 },
}

impl RegionQuery {
    /// Countries and states are queried by bounding box, cities by radius
    /// around their center. `None` when the geometry has no positions.
    pub fn for_record(record: &LocationRecord) -> Option<Self> {
        match record.kind {
            LocationKind::City => Some(Self::Radius {
                center: record.center,
                radius_km: CITY_QUERY_RADIUS_KM,
            }),
            LocationKind::Country | LocationKind::State => {
                containment::bounds(&record.geometry).map(|bounds| Self::Bbox { bounds })
            }
        }
    }

    /// Query parameters for the USGS FDSN event service.
    pub fn usgs_params(&self, window: &TimeWindow, limit: usize) -> Vec<(&'static str, String)> {
        let mut params = vec![("format", "geojson".to_string())];
        match self {
            Self::Bbox { bounds } => {
                params.push(("minlatitude", bounds.min_lat.to_string()));
                params.push(("maxlatitude", bounds.max_lat.to_string()));
                params.push(("minlongitude", bounds.min_lon.to_string()));
                params.push(("maxlongitude", bounds.max_lon.to_string()));
            }
            Self::Radius { center, radius_km } => {
                params.push(("latitude", center.lat.to_string()));
                params.push(("longitude", center.lon.to_string()));
                params.push(("maxradiuskm", radius_km.to_string()));
            }
        }
        params.push(("starttime", window.start.format("%Y-%m-%d").to_string()));
        params.push(("endtime", window.end.format("%Y-%m-%d").to_string()));
        params.push(("orderby", "magnitude".to_string()));
        params.push(("limit", limit.to_string()));
        params
    }
}

/// Events inside `window` and inside the record's geometry, strongest first,
/// at most `top_n` of them. Missing magnitudes rank as 0.
pub fn select_events(
    record: &LocationRecord,
    events: &[HazardEvent],
    window: &TimeWindow,
    top_n: usize,
) -> Vec<HazardEvent> {
    let in_window: Vec<HazardEvent> = events
        .iter()
        .filter(|e| window.contains(e.time))
        .cloned()
        .collect();

    let mut selected = containment::filter_points_in(&record.geometry, &in_window);
    selected.sort_by(|a, b| {
        let (ma, mb) = (a.magnitude.unwrap_or(0.0), b.magnitude.unwrap_or(0.0));
        mb.total_cmp(&ma)
    });
    selected.truncate(top_n);

    tracing::debug!(
        "{} of {} events kept for {} '{}'",
        selected.len(),
        events.len(),
        record.kind,
        record.name
    );
    selected
}
