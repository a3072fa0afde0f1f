mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/contains", get(handlers::contains))
        .route("/api/bbox", get(handlers::bounding_box))
        .route(
            "/api/risk-zones",
            get(handlers::risk_zones).post(handlers::add_risk_zone),
        )
        .route("/api/normalize", get(handlers::normalize))
        .route("/api/cache/clear", post(handlers::clear_cache))
        .route("/api/cache/stats", get(handlers::cache_stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("cannot bind to {}: {}", addr, e))?;

    tracing::info!("disaster-geo server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
