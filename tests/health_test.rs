mod common;

use axum::http::Method;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use common::{response_json, TestApp};

#[tokio::test]
async fn health_endpoint_reports_up() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/health", None).await;
    assert_eq!(response.status(), 200);

    let body = response_json(response).await;
    assert_eq!(body["status"], "UP");
    assert_eq!(body["message"], "Service is running");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

    let timestamp: DateTime<Utc> = body["timestamp"]
        .as_str()
        .expect("timestamp string")
        .parse()
        .expect("rfc3339 timestamp");
    let age = Utc::now() - timestamp;
    assert!(age.num_seconds().abs() < 5, "timestamp should be fresh");
}

#[tokio::test]
async fn health_response_carries_a_trace_id_header() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/health", None).await;

    let header = response
        .headers()
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .expect("trace id header");
    assert!(Uuid::parse_str(header).is_ok(), "trace id should be a UUID");
}
