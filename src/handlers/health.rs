use axum::{response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::AppState;

const STATUS_UP: &str = "UP";
const STATUS_MESSAGE: &str = "Service is running";

/// Internal health shape, as produced by the reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthInfo {
    pub application_status: String,
    pub status_message: String,
    pub application_version: String,
    pub check_time: DateTime<Utc>,
}

/// Public health shape returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

/// Builds the liveness payload with the current server timestamp.
pub fn report() -> HealthInfo {
    HealthInfo {
        application_status: STATUS_UP.to_string(),
        status_message: STATUS_MESSAGE.to_string(),
        application_version: env!("CARGO_PKG_VERSION").to_string(),
        check_time: Utc::now(),
    }
}

/// Pure 1:1 field renaming from the internal to the public shape.
pub fn to_health_response(info: HealthInfo) -> HealthResponse {
    HealthResponse {
        status: info.application_status,
        message: info.status_message,
        version: info.application_version,
        timestamp: info.check_time,
    }
}

/// Liveness probe. Always 200 while the process is serving requests.
async fn health_check() -> Json<HealthResponse> {
    let response = to_health_response(report());
    info!(status = %response.status, "Health check completed");
    Json(response)
}

/// Creates the router for health check endpoints.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}
