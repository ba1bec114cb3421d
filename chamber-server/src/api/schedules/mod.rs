//! Schedule API 模块 (每周出诊时间)

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/schedules", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", put(handler::replace))
        .route("/location/{location_id}", get(handler::by_location))
        .route(
            "/provider/{provider_id}/location/{location_id}",
            get(handler::by_provider),
        )
}
