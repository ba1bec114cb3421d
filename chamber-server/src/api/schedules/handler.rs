//! Schedule API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{ScheduleReplace, ScheduleSlot};

use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

/// PUT /api/schedules - 整体替换某医生在某地点的出诊时间
pub async fn replace(
    State(state): State<ServerState>,
    Json(payload): Json<ScheduleReplace>,
) -> AppResult<ApiResponse<Vec<ScheduleSlot>>> {
    Ok(ApiResponse::success(state.queue.replace_schedule(payload)?))
}

/// GET /api/schedules/location/:location_id
pub async fn by_location(
    State(state): State<ServerState>,
    Path(location_id): Path<String>,
) -> AppResult<ApiResponse<Vec<ScheduleSlot>>> {
    Ok(ApiResponse::success(state.queue.location_schedule(&location_id)?))
}

/// GET /api/schedules/provider/:provider_id/location/:location_id
pub async fn by_provider(
    State(state): State<ServerState>,
    Path((provider_id, location_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<Vec<ScheduleSlot>>> {
    Ok(ApiResponse::success(
        state.queue.provider_schedule(&provider_id, &location_id)?,
    ))
}
