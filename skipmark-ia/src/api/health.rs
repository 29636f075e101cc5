//! Health check handler

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// GET /health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: i64,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.startup_time;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime.num_seconds(),
    })
}

/// Health route table
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
