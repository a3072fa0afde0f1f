mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{default_geocoder, resolver_with};
use disaster_geo::server::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn app(dir: &TempDir) -> Router {
    let resolver = resolver_with(dir.path(), default_geocoder());
    build_router(Arc::new(AppState::new(resolver)))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

#[tokio::test]
async fn resolve_found_and_not_found() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/resolve?name=India&type=country").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "country");
    assert_eq!(body["name"], "India");
    assert_eq!(body["iso"], "IN");
    assert!(body["center"]["lat"].is_f64());

    let (status, body) = get(&app, "/api/resolve?name=Mumbai&type=city").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw_location"]["address"], "Mumbai, India, Earth");

    let (status, body) = get(&app, "/api/resolve?name=UnknownCountryXYZ").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Could not find coordinates for country: UnknownCountryXYZ");
}

#[tokio::test]
async fn resolve_failure_status_follows_cause() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/resolve?name=Kerala&type=state").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["type"], "state");
    assert_eq!(body["location"], "Kerala");

    let (status, body) = get(&app, "/api/resolve?name=Brokenland").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["name"], "Brokenland");

    // cached failures keep their status
    let (status, _) = get(&app, "/api/resolve?name=Kerala&type=state").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn resolve_rejects_bad_input() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, _) = get(&app, "/api/resolve?name=India&type=planet").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = get(&app, "/api/resolve?name=%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
}

#[tokio::test]
async fn contains_reports_status() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/contains?lat=20.59&lon=78.96&name=India").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"inside": true, "status": "inside"}));

    let (_, body) = get(&app, "/api/contains?lat=35.86&lon=104.19&name=India&type=country").await;
    assert_eq!(body["status"], "outside");

    let (_, body) = get(&app, "/api/contains?lat=0&lon=0&name=Atlantis&type=city").await;
    assert_eq!(body, json!({"inside": false, "status": "unknown"}));

    let (status, _) = get(&app, "/api/contains?lat=95&lon=0&name=India").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bbox_and_normalize() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/bbox?name=bharat").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["min_lon"].as_f64().unwrap() < body["max_lon"].as_f64().unwrap());

    let (status, _) = get(&app, "/api/bbox?name=Atlantis").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "/api/normalize?name=Nigera").await;
    assert_eq!(body, json!({"input": "Nigera", "canonical": "Nigeria"}));
}

#[tokio::test]
async fn risk_zone_round_trip() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    let (status, body) = get(&app, "/api/risk-zones?country=India&hazard=cyclone").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body.as_array().unwrap().is_empty());

    let zone = json!({
        "country": "Nepal",
        "hazard": "landslide",
        "zone": "Kali Gandaki",
        "ring": [[83.4, 28.0], [84.0, 28.0], [84.0, 29.0], [83.4, 29.0]]
    });
    let (status, body) = post(&app, "/api/risk-zones", zone).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body[0]["name"], "Kali Gandaki");

    let (_, body) = get(&app, "/api/risk-zones?country=Nepal&hazard=landslide").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let sliver = json!({"country": "Nepal", "hazard": "landslide", "zone": "x", "ring": [[83.0, 28.0], [84.0, 28.0]]});
    let (status, _) = post(&app, "/api/risk-zones", sliver).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let lost = json!({"country": "Atlantis", "hazard": "flood", "zone": "x", "ring": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]});
    let (status, _) = post(&app, "/api/risk-zones", lost).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cache_clear_empties_resolutions() {
    let dir = TempDir::new().unwrap();
    let app = app(&dir);

    get(&app, "/api/resolve?name=India").await;
    get(&app, "/api/resolve?name=China").await;

    let (_, stats) = get(&app, "/api/cache/stats").await;
    assert_eq!(stats["entries"], 2);

    let (status, body) = post(&app, "/api/cache/clear", Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 2);

    let (_, stats) = get(&app, "/api/cache/stats").await;
    assert_eq!(stats["entries"], 0);
}
