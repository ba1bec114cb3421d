//! Provider API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{
    Coordinates, JourneyStart, Location, PositionOutcome, PositionReport, Provider,
    ProviderCreate, SessionEnd,
};

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

/// POST /api/providers
pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<ProviderCreate>,
) -> AppResult<ApiResponse<Provider>> {
    Ok(ApiResponse::success(state.journey.register_provider(payload)?))
}

/// GET /api/providers/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Provider>> {
    Ok(ApiResponse::success(state.journey.get_provider(&id)?))
}

/// POST /api/providers/:id/journey - 出发
pub async fn start_journey(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<JourneyStart>,
) -> AppResult<ApiResponse<Location>> {
    let location = state.journey.start_journey(&id, &payload.location_id).await?;
    Ok(ApiResponse::success(location))
}

/// POST /api/providers/:id/position - 上报位置
pub async fn report_position(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<PositionReport>,
) -> AppResult<ApiResponse<PositionOutcome>> {
    let position = Coordinates::new(payload.lat, payload.lng);
    let outcome = state.journey.report_position(&id, position).await?;
    Ok(ApiResponse::success(outcome))
}

/// POST /api/providers/:id/end-session - 结束当日接诊
pub async fn end_session(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<SessionEnd>,
) -> AppResult<ApiResponse<Location>> {
    let location = state.journey.end_session(&id, &payload.location_id).await?;
    Ok(ApiResponse::success(location))
}
