//! skipmark-ia library interface
//!
//! Exposes the analysis scheduler, its services, and the HTTP surface for
//! integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::runner::RunCoordinator;
use skipmark_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Run lifecycle coordinator (single-run enforcement)
    pub coordinator: Arc<RunCoordinator>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, coordinator: Arc<RunCoordinator>) -> Self {
        Self {
            db,
            event_bus,
            coordinator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::analysis_routes())
        .merge(api::settings_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
}
