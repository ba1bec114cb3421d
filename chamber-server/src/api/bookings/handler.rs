//! Booking API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Booking, BookingCreate, BookingStatus, BookingStatusUpdate};

use crate::api::RequesterId;
use crate::core::ServerState;
use crate::utils::time;
use crate::utils::{ApiResponse, AppResult};

/// POST /api/bookings - 挂号
///
/// 超出容量的号码仍然发放，状态为 `extra`。
pub async fn create(
    State(state): State<ServerState>,
    RequesterId(requester_id): RequesterId,
    Json(payload): Json<BookingCreate>,
) -> AppResult<ApiResponse<Booking>> {
    let date = time::parse_date(&payload.date)?;
    let booking = state
        .queue
        .create_booking(&payload.location_id, date, &requester_id)
        .await?;

    let message = match booking.status {
        BookingStatus::Extra => "Booking confirmed as extra",
        _ => "Booking confirmed",
    };
    Ok(ApiResponse::success_with_message(message, booking))
}

/// GET /api/bookings/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Booking>> {
    Ok(ApiResponse::success(state.queue.get_booking(&id)?))
}

/// PUT /api/bookings/:id/status - 完成 / 取消 / 爽约
pub async fn update_status(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<BookingStatusUpdate>,
) -> AppResult<ApiResponse<Booking>> {
    let booking = state.queue.update_booking_status(&id, payload.status).await?;
    Ok(ApiResponse::success(booking))
}
