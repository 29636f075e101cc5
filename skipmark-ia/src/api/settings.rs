//! Analysis settings API handlers
//!
//! GET /settings/analysis, PUT /settings/analysis

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::models::{AnalysisSettings, MarkerMode};
use crate::AppState;

/// PUT /settings/analysis request; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub max_parallelism: Option<usize>,
    pub analyze_specials: Option<bool>,
    pub regenerate_markers: Option<bool>,
    pub marker_mode: Option<MarkerMode>,
}

/// GET /settings/analysis
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<AnalysisSettings>> {
    let settings = db::settings::load_analysis_settings(&state.db).await?;
    Ok(Json(settings))
}

/// PUT /settings/analysis
///
/// Applies the provided fields and returns the updated snapshot.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<Json<AnalysisSettings>> {
    if let Some(count) = request.max_parallelism {
        db::settings::set_max_parallelism(&state.db, count)
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    }

    if let Some(enabled) = request.analyze_specials {
        db::settings::set_analyze_specials(&state.db, enabled).await?;
    }

    if let Some(enabled) = request.regenerate_markers {
        db::settings::set_regenerate_markers(&state.db, enabled).await?;
    }

    if let Some(mode) = request.marker_mode {
        db::settings::set_marker_mode(&state.db, mode).await?;
    }

    let settings = db::settings::load_analysis_settings(&state.db).await?;

    tracing::info!(
        max_parallelism = settings.max_parallelism,
        analyze_specials = settings.analyze_specials,
        regenerate_markers = settings.regenerate_markers,
        marker_mode = %settings.marker_mode,
        "Analysis settings updated"
    );

    Ok(Json(settings))
}

/// Settings route table
pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/settings/analysis", get(get_settings).put(update_settings))
}
