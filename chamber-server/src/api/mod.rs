//! API 路由模块
//!
//! - [`health`] - 健康检查
//! - [`locations`] - 地点、叫号、队列、实时状态
//! - [`bookings`] - 挂号
//! - [`providers`] - 医生与行程
//! - [`schedules`] - 每周出诊时间

pub mod bookings;
pub mod health;
pub mod identity;
pub mod locations;
pub mod providers;
pub mod schedules;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

pub use identity::RequesterId;

/// 组装全部路由
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(locations::router())
        .merge(bookings::router())
        .merge(providers::router())
        .merge(schedules::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
