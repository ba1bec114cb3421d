//! Location API Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use shared::models::{
    CapacityUpdate, DelayReport, Location, LocationCreate, LocationStatusView, QueueEntry,
};
use tokio::sync::broadcast::error::RecvError;

use crate::core::ServerState;
use crate::journey::JourneyTracker;
use crate::utils::time;
use crate::utils::{ApiResponse, AppResult};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub provider_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    /// YYYY-MM-DD, defaults to today
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdmissionState {
    pub is_admitting: bool,
}

#[derive(Debug, Serialize)]
pub struct ServingState {
    pub current_served: u32,
}

/// POST /api/locations - 创建地点
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<LocationCreate>,
) -> AppResult<ApiResponse<Location>> {
    let location = state.queue.create_location(payload).await?;
    Ok(ApiResponse::success(location))
}

/// GET /api/locations - 地点列表 (新建在前)
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<ApiResponse<Vec<Location>>> {
    let locations = state.queue.list_locations(query.provider_id.as_deref())?;
    Ok(ApiResponse::success(locations))
}

/// GET /api/locations/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Location>> {
    Ok(ApiResponse::success(state.queue.get_location(&id)?))
}

/// PUT /api/locations/:id/capacity
pub async fn set_capacity(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<CapacityUpdate>,
) -> AppResult<ApiResponse<Location>> {
    let location = state.queue.set_capacity(&id, payload.max_admissions).await?;
    Ok(ApiResponse::success(location))
}

/// POST /api/locations/:id/toggle - 开关挂号
pub async fn toggle_admission(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<AdmissionState>> {
    let is_admitting = state.queue.toggle_admission(&id).await?;
    Ok(ApiResponse::success(AdmissionState { is_admitting }))
}

/// POST /api/locations/:id/next - 叫下一位
pub async fn call_next(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ServingState>> {
    let current_served = state.queue.call_next(&id).await?;
    Ok(ApiResponse::success(ServingState { current_served }))
}

/// GET /api/locations/:id/queue?date=YYYY-MM-DD
pub async fn queue_snapshot(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Query(query): Query<QueueQuery>,
) -> AppResult<ApiResponse<Vec<QueueEntry>>> {
    let date = query.date.as_deref().map(time::parse_date).transpose()?;
    let entries = state.queue.queue_snapshot(&id, date)?;
    Ok(ApiResponse::success(entries))
}

/// GET /api/locations/:id/requesters
pub async fn list_requesters(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::success(state.queue.list_requesters(&id)?))
}

/// GET /api/locations/:id/status - 实时状态
pub async fn status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<LocationStatusView>> {
    Ok(ApiResponse::success(state.journey.status(&id)?))
}

/// POST /api/locations/:id/delay - 报告延误
pub async fn report_delay(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<DelayReport>,
) -> AppResult<ApiResponse<Location>> {
    let location = state.journey.report_delay(&id, payload.minutes).await?;
    Ok(ApiResponse::success(location))
}

/// GET /api/locations/:id/status/stream - SSE 实时状态
///
/// 先推送一次当前状态，之后该地点每次变化推送最新状态。
pub async fn status_stream(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    // Subscribe before the first read so no change slips between them
    let rx = state.queue.subscribe();
    let initial = state.journey.status(&id)?;

    let updates = stream::unfold(
        (rx, state.journey.clone(), id),
        |(mut rx, journey, id)| async move {
            loop {
                match rx.recv().await {
                    Ok(event) if !event.concerns(&id) => continue,
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        let view = next_view(&journey, &id)?;
                        return Some((view, (rx, journey, id)));
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        },
    );

    let events = stream::once(async move { initial })
        .chain(updates)
        .map(|view| Ok(status_event(&view)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn next_view(journey: &JourneyTracker, id: &str) -> Option<LocationStatusView> {
    match journey.status(id) {
        Ok(view) => Some(view),
        Err(e) => {
            tracing::warn!(location_id = %id, error = %e, "Closing status stream");
            None
        }
    }
}

fn status_event(view: &LocationStatusView) -> Event {
    match Event::default().event("status").json_data(view) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to encode status event: {}", e);
            Event::default().event("error").data("encode failed")
        }
    }
}
