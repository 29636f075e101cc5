//! Analysis run API handlers
//!
//! POST /analysis/start, POST /analysis/cancel, GET /analysis/status

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::runner::{FinishedRun, StartError};
use crate::AppState;

/// POST /analysis/start response
#[derive(Debug, Serialize)]
pub struct StartAnalysisResponse {
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// GET /analysis/status response
#[derive(Debug, Serialize)]
pub struct AnalysisStatusResponse {
    pub running: bool,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_run: Option<FinishedRun>,
}

/// POST /analysis/cancel response
#[derive(Debug, Serialize)]
pub struct CancelAnalysisResponse {
    pub cancelling: bool,
}

/// POST /analysis/start
///
/// Begin a batch analysis run. Returns 202 Accepted; 409 when a run is
/// already active.
pub async fn start_analysis(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<StartAnalysisResponse>)> {
    match state.coordinator.try_start() {
        Ok(()) => {
            let started_at = state
                .coordinator
                .active_since()
                .unwrap_or_else(chrono::Utc::now);

            tracing::info!("Analysis run started via API");

            Ok((
                StatusCode::ACCEPTED,
                Json(StartAnalysisResponse { started_at }),
            ))
        }
        Err(StartError::AlreadyRunning) => Err(ApiError::Conflict(
            "Analysis run already active".to_string(),
        )),
    }
}

/// POST /analysis/cancel
///
/// Request cooperative cancellation of the active run.
pub async fn cancel_analysis(
    State(state): State<AppState>,
) -> ApiResult<Json<CancelAnalysisResponse>> {
    if state.coordinator.cancel() {
        tracing::info!("Analysis cancellation requested via API");
        Ok(Json(CancelAnalysisResponse { cancelling: true }))
    } else {
        Err(ApiError::Conflict("No analysis run active".to_string()))
    }
}

/// GET /analysis/status
pub async fn get_analysis_status(
    State(state): State<AppState>,
) -> ApiResult<Json<AnalysisStatusResponse>> {
    let started_at = state.coordinator.active_since();

    Ok(Json(AnalysisStatusResponse {
        running: started_at.is_some(),
        started_at,
        last_run: state.coordinator.last_run(),
    }))
}

/// Analysis route table
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis/start", post(start_analysis))
        .route("/analysis/cancel", post(cancel_analysis))
        .route("/analysis/status", get(get_analysis_status))
}
