//! Provider API 模块 (医生与行程)

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/providers", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::register))
        .route("/{id}", get(handler::get_by_id))
        .route("/{id}/journey", post(handler::start_journey))
        .route("/{id}/position", post(handler::report_position))
        .route("/{id}/end-session", post(handler::end_session))
}
