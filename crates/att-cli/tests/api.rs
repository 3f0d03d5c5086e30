//! HTTP API tests driven through the router with `oneshot`.

use std::sync::{Arc, Mutex};

use att_cli::Config;
use att_cli::server::{AppState, create_router};
use att_core::Clock;
use att_db::{Database, NewEmployee};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, FixedOffset};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Clock the test moves between requests.
struct TestClock(Mutex<DateTime<FixedOffset>>);

impl TestClock {
    fn at(rfc3339: &str) -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            DateTime::parse_from_rfc3339(rfc3339).unwrap(),
        )))
    }

    fn set(&self, rfc3339: &str) {
        *self.0.lock().unwrap() = DateTime::parse_from_rfc3339(rfc3339).unwrap();
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.0.lock().unwrap()
    }
}

fn test_app(clock: Arc<TestClock>) -> Router {
    let mut db = Database::open_in_memory().unwrap();
    for (name, identifier, department) in [("Jo", "BEAC01", "IT"), ("Ana Ruiz", "BEAC02", "Ops")] {
        db.insert_employee(&NewEmployee {
            name: name.to_string(),
            identifier: identifier.to_string(),
            active: true,
            role: Some("Engineer".to_string()),
            department: Some(department.to_string()),
            external_id: None,
        })
        .unwrap();
    }
    create_router(AppState::new(db, clock, Config::default()))
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn detect(router: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/detect")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

/// Jo works 09:00-12:00, takes lunch, and is back at 12:30.
async fn seed_day(router: &Router, clock: &TestClock) {
    for (at, action) in [
        ("2025-01-06T09:00:00Z", "checkin"),
        ("2025-01-06T12:00:00Z", "checkout"),
        ("2025-01-06T12:30:00Z", "checkin"),
    ] {
        clock.set(at);
        let (status, _) = detect(router, json!({"identifier": "BEAC01", "action": action})).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn detect_records_then_dedups() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());

    let (status, body) = detect(&router, json!({"identifier": "BEAC01"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["deduped"], false);
    assert_eq!(body["employee_name"], "Jo");
    assert_eq!(body["status"], "checkin");
    assert_eq!(body["timestamp_details"]["weekday"], "Monday");

    clock.set("2025-01-06T09:01:00Z");
    let (status, body) = detect(&router, json!({"hex_value": "4A6F"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "deduped": true}));

    clock.set("2025-01-06T09:01:01Z");
    let (_, body) = detect(&router, json!({"identifier": "BEAC01"})).await;
    assert_eq!(body["deduped"], false);
}

#[tokio::test]
async fn detect_maps_failures_to_status_codes() {
    let router = test_app(TestClock::at("2025-01-06T09:00:00Z"));

    let (status, body) = detect(&router, json!({"identifier": "ZZ"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "DECODE_ERROR");

    // "Nobody"
    let (status, body) = detect(&router, json!({"identifier": "4E6F626F6479"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = detect(&router, json!({"identifier": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = detect(&router, json!({"action": "checkin"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) =
        detect(&router, json!({"identifier": "BEAC01", "action": "lunch"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn annotated_listing_labels_breaks() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());
    seed_day(&router, &clock).await;

    let (status, body) = get_json(&router, "/api/attendance?date=2025-01-06&annotate=true").await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["time"], "12:30:00");
    assert_eq!(rows[0]["annotation"]["label"], "Lunch break (30m)");
    assert_eq!(rows[1]["annotation"]["last_of_day"], true);
    assert_eq!(rows[2]["annotation"]["first_of_day"], true);

    let (_, body) = get_json(&router, "/api/attendance?limit=1").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert!(body[0].get("annotation").is_none());
}

#[tokio::test]
async fn listing_rejects_bad_filters() {
    let router = test_app(TestClock::at("2025-01-06T09:00:00Z"));

    let (status, body) = get_json(&router, "/api/attendance?date=06-01-2025").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = get_json(&router, "/api/attendance?limit=many").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = get_json(&router, "/api/attendance?date=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn empty_query_parameters_are_ignored() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());
    seed_day(&router, &clock).await;

    let (status, body) =
        get_json(&router, "/api/attendance?status=&employee_id=&limit=&annotate=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = get_json(&router, "/api/attendance/summary?date=2025-01-06&status=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let request = Request::builder()
        .uri("/api/attendance/export?date=2025-01-06&status=&employee_id=")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap().lines().count(), 4);

    let (status, body) = get_json(&router, "/api/employees/1/attendance?limit=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, body) = get_json(&router, "/api/attendance?status=lunch").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn summary_reports_pending_day_in_progress() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());
    seed_day(&router, &clock).await;
    clock.set("2025-01-06T15:00:00Z");

    let (status, body) = get_json(&router, "/api/attendance/summary?date=2025-01-06").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{
            "employee_name": "Jo",
            "employee_id": 1,
            "date": "2025-01-06",
            "first_checkin": "09:00:00",
            "last_checkout": "pending",
            "break_seconds": 1800,
            "worked_seconds": 19800,
        }])
    );
}

#[tokio::test]
async fn stats_count_present_employees() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());
    seed_day(&router, &clock).await;
    clock.set("2025-01-06T12:45:00Z");
    detect(&router, json!({"identifier": "BEAC02"})).await;

    let (status, body) = get_json(&router, "/api/attendance/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2025-01-06");
    assert_eq!(body["today_checkins"], 3);
    assert_eq!(body["currently_present"], 2);
    assert_eq!(body["total_employees"], 2);
}

#[tokio::test]
async fn export_downloads_csv() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());
    seed_day(&router, &clock).await;

    let request = Request::builder()
        .uri("/api/attendance/export?month=2025-01&department=IT")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"attendance-2025-01.csv\""
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let csv = String::from_utf8(body.to_vec()).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "Date,Time,Employee,Status,Break Type,Break Duration,First Of Day,Last Of Day,Device Identifier,Employee ID"
    );
    assert!(lines[1].starts_with("\"2025-01-06\",\"09:00:00\",\"Jo\",\"checkin\""));
    assert!(lines[3].contains("\"Lunch break\",\"30m\""));
}

#[tokio::test]
async fn export_requires_date_or_month() {
    let router = test_app(TestClock::at("2025-01-06T09:00:00Z"));
    let (status, body) = get_json(&router, "/api/attendance/export?department=IT").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn employee_listing_honours_limit() {
    let clock = TestClock::at("2025-01-06T09:00:00Z");
    let router = test_app(clock.clone());
    seed_day(&router, &clock).await;

    let (status, body) = get_json(&router, "/api/employees/1/attendance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = get_json(&router, "/api/employees/1/attendance?limit=2").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (_, body) = get_json(&router, "/api/employees/2/attendance").await;
    assert_eq!(body, json!([]));

    let (status, body) = get_json(&router, "/api/employees/jo/attendance").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
