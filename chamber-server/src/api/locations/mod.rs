//! Location API 模块 (地点、叫号、队列、实时状态)

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/locations", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/capacity", put(handler::set_capacity))
        .route("/{id}/toggle", post(handler::toggle_admission))
        .route("/{id}/next", post(handler::call_next))
        .route("/{id}/queue", get(handler::queue_snapshot))
        .route("/{id}/requesters", get(handler::list_requesters))
        .route("/{id}/status", get(handler::status))
        .route("/{id}/status/stream", get(handler::status_stream))
        .route("/{id}/delay", post(handler::report_delay))
}
