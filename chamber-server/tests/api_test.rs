//! HTTP 路由测试 (tower oneshot, 内存数据库)

use axum::Router;
use axum::body::Body;
use chamber_server::{Config, QueueStorage, ServerState, api};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let mut config = Config::with_overrides("/tmp/chamber-api-test", 0);
    config.timezone = chrono_tz::UTC;
    let state = ServerState::with_storage(config, QueueStorage::open_in_memory().unwrap());
    api::router(state)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    requester: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(requester) = requester {
        builder = builder.header("x-requester-id", requester);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_location(app: &Router, max_admissions: u32) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/locations",
        None,
        Some(json!({
            "name": "Room 402",
            "provider_id": null,
            "max_admissions": max_admissions,
            "destination": { "lat": 23.7509, "lng": 90.3935 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn today() -> String {
    chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

#[tokio::test]
async fn health_reports_database() {
    let app = app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "ok");
}

#[tokio::test]
async fn booking_flow_over_http() {
    let app = app();
    let location_id = create_location(&app, 2).await;

    let mut serials = Vec::new();
    for who in ["p1", "p2", "p3"] {
        let (status, body) = send(
            &app,
            "POST",
            "/api/bookings",
            Some(who),
            Some(json!({ "location_id": location_id, "date": today() })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        serials.push((
            body["data"]["serial_number"].as_u64().unwrap(),
            body["data"]["status"].as_str().unwrap().to_string(),
        ));
    }
    assert_eq!(
        serials,
        vec![
            (1, "pending".to_string()),
            (2, "pending".to_string()),
            (3, "extra".to_string())
        ]
    );

    let (status, body) = send(&app, "GET", &format!("/api/locations/{location_id}/queue"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["requester_id"], "p1");

    let (status, body) = send(&app, "GET", &format!("/api/locations/{location_id}/requesters"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!(["p1", "p2", "p3"]));
}

#[tokio::test]
async fn booking_requires_requester_header() {
    let app = app();
    let location_id = create_location(&app, 5).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        None,
        Some(json!({ "location_id": location_id, "date": today() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn bad_date_is_validation_error() {
    let app = app();
    let location_id = create_location(&app, 5).await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some("p1"),
        Some(json!({ "location_id": location_id, "date": "31/12/2026" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn call_next_exhausted_is_unprocessable() {
    let app = app();
    let location_id = create_location(&app, 5).await;

    let (status, body) = send(&app, "POST", &format!("/api/locations/{location_id}/next"), None, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4004);

    send(
        &app,
        "POST",
        "/api/bookings",
        Some("p1"),
        Some(json!({ "location_id": location_id, "date": today() })),
    )
    .await;
    let (status, body) = send(&app, "POST", &format!("/api/locations/{location_id}/next"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_served"], 1);
}

#[tokio::test]
async fn toggle_closes_admission() {
    let app = app();
    let location_id = create_location(&app, 5).await;

    let (status, body) = send(&app, "POST", &format!("/api/locations/{location_id}/toggle"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_admitting"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some("p1"),
        Some(json!({ "location_id": location_id, "date": today() })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4003);
}

#[tokio::test]
async fn unknown_location_is_not_found() {
    let app = app();
    let (status, body) = send(&app, "GET", "/api/locations/nope/status", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 4001);
}

#[tokio::test]
async fn journey_over_http() {
    let app = app();
    let location_id = create_location(&app, 5).await;

    let (status, body) = send(&app, "POST", "/api/providers", None, Some(json!({ "name": "Dr. Rahman" }))).await;
    assert_eq!(status, StatusCode::OK);
    let provider_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/providers/{provider_id}/journey"),
        None,
        Some(json!({ "location_id": location_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["travel_status"], "EN_ROUTE");

    // Out-of-range latitude
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/providers/{provider_id}/position"),
        None,
        Some(json!({ "lat": 123.0, "lng": 90.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/locations/{location_id}/delay"),
        None,
        Some(json!({ "minutes": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // At the door
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/providers/{provider_id}/position"),
        None,
        Some(json!({ "lat": 23.7509, "lng": 90.3935 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["arrived"], true);

    let (_, body) = send(&app, "GET", &format!("/api/locations/{location_id}/status"), None, None).await;
    assert_eq!(body["data"]["status"], "ARRIVED");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/providers/{provider_id}/journey"),
        None,
        Some(json!({ "location_id": location_id })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 5002);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/providers/{provider_id}/end-session"),
        None,
        Some(json!({ "location_id": location_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["travel_status"], "AT_BASE");
}

#[tokio::test]
async fn booking_status_update_over_http() {
    let app = app();
    let location_id = create_location(&app, 5).await;
    let (_, body) = send(
        &app,
        "POST",
        "/api/bookings",
        Some("p1"),
        Some(json!({ "location_id": location_id, "date": today() })),
    )
    .await;
    let booking_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/bookings/{booking_id}/status"),
        None,
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/bookings/{booking_id}/status"),
        None,
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], 4007);
}

#[tokio::test]
async fn schedules_over_http() {
    let app = app();
    let location_id = create_location(&app, 5).await;
    let (_, body) = send(&app, "POST", "/api/providers", None, Some(json!({ "name": "Dr. Rahman" }))).await;
    let provider_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/schedules",
        None,
        Some(json!({
            "provider_id": provider_id,
            "location_id": location_id,
            "schedules": [
                { "day_of_week": "Thu", "shift_name": "Evening", "start_time": "17:00", "end_time": "21:00" },
                { "day_of_week": "Mon", "shift_name": "Morning", "start_time": "09:00", "end_time": "12:00", "max_patients": 30 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"][0]["day_of_week"], "Mon");
    assert_eq!(body["data"][0]["max_patients"], 30);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/schedules/provider/{provider_id}/location/{location_id}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", &format!("/api/schedules/location/{location_id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["start_time"], "09:00");
    assert_eq!(body["data"][1]["start_time"], "17:00");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/schedules",
        None,
        Some(json!({
            "provider_id": provider_id,
            "location_id": location_id,
            "schedules": [
                { "day_of_week": "Fri", "shift_name": "Late", "start_time": "22:00", "end_time": "20:00" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);
}
