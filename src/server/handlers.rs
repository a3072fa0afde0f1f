use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::geometry::{BoundingBox, Ring};
use crate::location::types::{Containment, LocationError, LocationKind, Resolution, RiskZone};
use crate::location::{CacheStats, LocationResolver};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

fn status_for(e: &LocationError) -> StatusCode {
    match e {
        LocationError::NotFound(_) => StatusCode::NOT_FOUND,
        LocationError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
        LocationError::GeocoderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        LocationError::Network(_) | LocationError::InvalidResponse(_) => StatusCode::BAD_GATEWAY,
        LocationError::GeometryParse(_)
        | LocationError::DataUnavailable(_)
        | LocationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LocationError> for ApiError {
    fn from(e: LocationError) -> Self {
        api_error(status_for(&e), e.to_string())
    }
}

/// Run resolver work off the async runtime; geocoding and dataset I/O block.
async fn with_resolver<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut LocationResolver) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || {
        let mut resolver = state.resolver();
        f(&mut resolver)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("resolver task failed: {}", e)))
}

fn required(value: Option<String>, param: &str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(api_error(StatusCode::BAD_REQUEST, format!("Missing '{}' parameter", param))),
    }
}

fn parse_kind(value: Option<&str>) -> Result<LocationKind, ApiError> {
    match value {
        None => Ok(LocationKind::Country),
        Some(s) => s.parse().map_err(ApiError::from),
    }
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let name = required(params.name, "name")?;
    let kind = parse_kind(params.kind.as_deref())?;

    let lookup = name.clone();
    let resolution = with_resolver(&state, move |r| r.resolve(&lookup, kind)).await?;

    tracing::debug!(
        "GET /api/resolve name={} type={} -> {} ({:.1}ms)",
        name,
        kind,
        if resolution.is_found() { "found" } else { "error" },
        start.elapsed().as_secs_f64() * 1000.0,
    );

    let status = match resolution.as_ref() {
        Resolution::Found(_) => StatusCode::OK,
        Resolution::Failed(record) => record
            .cause
            .as_ref()
            .map_or(StatusCode::NOT_FOUND, status_for),
    };
    Ok((status, Json(resolution.as_ref().clone())).into_response())
}

// ─── GET /api/contains ───────────────────────────────────────────

#[derive(Deserialize)]
pub struct ContainsQuery {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Serialize)]
pub struct ContainsResponse {
    pub inside: bool,
    pub status: Containment,
}

pub async fn contains(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContainsQuery>,
) -> Result<Json<ContainsResponse>, ApiError> {
    let name = required(params.name, "name")?;
    let kind = parse_kind(params.kind.as_deref())?;
    if !(-90.0..=90.0).contains(&params.lat) || !(-180.0..=180.0).contains(&params.lon) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Invalid coordinates. Lat: -90..90, Lon: -180..180",
        ));
    }

    let (lat, lon) = (params.lat, params.lon);
    let status = with_resolver(&state, move |r| r.containment(lat, lon, &name, kind)).await?;
    Ok(Json(ContainsResponse {
        inside: status == Containment::Inside,
        status,
    }))
}

// ─── GET /api/bbox ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct NameQuery {
    pub name: Option<String>,
}

pub async fn bounding_box(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NameQuery>,
) -> Result<Json<BoundingBox>, ApiError> {
    let name = required(params.name, "name")?;
    let bbox = with_resolver(&state, move |r| r.bounding_box(&name)).await??;
    Ok(Json(bbox))
}

// ─── /api/risk-zones ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ZonesQuery {
    pub country: Option<String>,
    pub hazard: Option<String>,
}

pub async fn risk_zones(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ZonesQuery>,
) -> Result<Json<Vec<RiskZone>>, ApiError> {
    let country = required(params.country, "country")?;
    let hazard = required(params.hazard, "hazard")?;
    let zones = with_resolver(&state, move |r| r.get_risk_zones(&country, &hazard)).await??;
    Ok(Json(zones))
}

#[derive(Deserialize)]
pub struct AddZoneBody {
    pub country: String,
    pub hazard: String,
    pub zone: String,
    pub ring: Ring,
}

pub async fn add_risk_zone(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddZoneBody>,
) -> Result<(StatusCode, Json<Vec<RiskZone>>), ApiError> {
    let AddZoneBody {
        country,
        hazard,
        zone,
        ring,
    } = body;

    let zones = with_resolver(&state, move |r| {
        r.add_risk_zone(&country, &hazard, &zone, ring)?;
        r.get_risk_zones(&country, &hazard)
    })
    .await?
    .map_err(|e| match e {
        LocationError::GeometryParse(msg) => api_error(StatusCode::BAD_REQUEST, msg),
        other => ApiError::from(other),
    })?;

    Ok((StatusCode::CREATED, Json(zones)))
}

// ─── GET /api/normalize ──────────────────────────────────────────

#[derive(Serialize)]
pub struct NormalizeResponse {
    pub input: String,
    pub canonical: String,
}

pub async fn normalize(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NameQuery>,
) -> Result<Json<NormalizeResponse>, ApiError> {
    let input = required(params.name, "name")?;
    let text = input.clone();
    let canonical = with_resolver(&state, move |r| r.normalize(&text)).await?;
    Ok(Json(NormalizeResponse { input, canonical }))
}

// ─── Cache ───────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Result<Json<ClearResponse>, ApiError> {
    let cleared = with_resolver(&state, |r| {
        let n = r.cache_stats().entries;
        r.clear_cache();
        n
    })
    .await?;
    tracing::info!("resolution cache cleared ({} entries)", cleared);
    Ok(Json(ClearResponse { cleared }))
}

pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Result<Json<CacheStats>, ApiError> {
    let stats = with_resolver(&state, |r| r.cache_stats()).await?;
    Ok(Json(stats))
}
