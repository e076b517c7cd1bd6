//! Error taxonomy and the normalizer turning failures into HTTP responses.
//!
//! Every failure raised during request handling propagates unmodified to
//! the `IntoResponse` impl below, which is the single point mapping
//! internal failures onto the stable external contract. Internal classes
//! (`Database`, `Unexpected`) are logged server-side in full but never
//! leak detail to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

use crate::tracing::current_context;

/// Stable code for lookups whose target does not exist.
pub const CODE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
/// Stable code for structurally or semantically invalid input.
pub const CODE_VALIDATION: &str = "VALIDATION_ERROR";
/// Stable code for anything not classified, including database failures.
pub const CODE_INTERNAL: &str = "INTERNAL_ERROR";

/// One field-level violation inside a validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Uniform error body returned for every handled failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Numeric HTTP status, mirrored in the body for log correlation.
    pub status: u16,
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Request path, when the trace context is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Trace id correlating this response with server logs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// ISO 8601 timestamp when the error was produced.
    pub timestamp: String,
    /// Field-level violations; present for validation failures only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldError>,
}

/// Failure kinds raised anywhere in request handling.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Target of a lookup does not exist.
    #[error("{message}")]
    NotFound { message: String },

    /// A domain invariant would be broken by the requested operation.
    #[error("{message}")]
    BusinessRule { code: String, message: String },

    /// One or more structural or semantic input violations.
    #[error("Input validation failed")]
    Validation(Vec<FieldError>),

    /// Persistence failure; detail stays server-side.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Catch-all; detail stays server-side.
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    pub fn business_rule(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::BusinessRule {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation(details: Vec<FieldError>) -> Self {
        ApiError::Validation(details)
    }

    /// HTTP status for this failure kind. Single source of truth for the
    /// error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::BusinessRule { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code placed in the response body.
    pub fn response_code(&self) -> &str {
        match self {
            Self::NotFound { .. } => CODE_NOT_FOUND,
            Self::BusinessRule { code, .. } => code,
            Self::Validation(_) => CODE_VALIDATION,
            Self::Database(_) | Self::Unexpected(_) => CODE_INTERNAL,
        }
    }

    /// Message suitable for the response body. Internal failures return a
    /// generic message so implementation detail never reaches the client.
    pub fn response_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Unexpected(_) => "Unexpected error occurred".to_string(),
            Self::NotFound { message } | Self::BusinessRule { message, .. } => message.clone(),
            Self::Validation(_) => "Input validation failed".to_string(),
        }
    }

    fn field_details(&self) -> Vec<FieldError> {
        match self {
            Self::Validation(details) => details.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, violations)| {
                violations.iter().map(move |violation| {
                    let message = violation
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string());
                    FieldError::new(field, violation.code.to_string(), message)
                })
            })
            .collect();
        ApiError::Validation(details)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let context = current_context();
        let path = context.as_ref().map(|ctx| ctx.path.clone());
        let trace_id = context.map(|ctx| ctx.trace_id.as_str().to_string());

        // Severity matches the failure class; full detail is logged here
        // and nowhere else.
        match &self {
            Self::NotFound { message } => {
                tracing::info!(
                    trace_id = trace_id.as_deref().unwrap_or(""),
                    path = path.as_deref().unwrap_or(""),
                    "Resource not found: {message}"
                );
            }
            Self::Validation(details) => {
                tracing::warn!(
                    trace_id = trace_id.as_deref().unwrap_or(""),
                    path = path.as_deref().unwrap_or(""),
                    details = ?details,
                    "Input validation failed"
                );
            }
            Self::BusinessRule { code, message } => {
                tracing::warn!(
                    trace_id = trace_id.as_deref().unwrap_or(""),
                    path = path.as_deref().unwrap_or(""),
                    code = %code,
                    "Business rule violation: {message}"
                );
            }
            Self::Database(err) => {
                tracing::error!(
                    trace_id = trace_id.as_deref().unwrap_or(""),
                    path = path.as_deref().unwrap_or(""),
                    error = %err,
                    "Database failure"
                );
            }
            Self::Unexpected(err) => {
                tracing::error!(
                    trace_id = trace_id.as_deref().unwrap_or(""),
                    path = path.as_deref().unwrap_or(""),
                    error = %err,
                    "Unexpected failure"
                );
            }
        }

        let body = ErrorResponse {
            status: status.as_u16(),
            code: self.response_code().to_string(),
            message: self.response_message(),
            path,
            trace_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            details: self.field_details(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracing::{scope_request_context, RequestContext, TraceId};
    use axum::body::to_bytes;

    fn test_context(trace_id: &str, path: &str) -> RequestContext {
        RequestContext {
            trace_id: TraceId::new(trace_id),
            path: path.to_string(),
        }
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ApiError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::business_rule("SKU_ALREADY_EXISTS", "x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::validation(vec![]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Database(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Unexpected(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn not_found_keeps_its_message_and_code() {
        let response = scope_request_context(
            test_context("trace-404", "/api/v1/products/42"),
            async { ApiError::not_found("Product 42 not found").into_response() },
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.status, 404);
        assert_eq!(payload.code, CODE_NOT_FOUND);
        assert_eq!(payload.message, "Product 42 not found");
        assert_eq!(payload.path.as_deref(), Some("/api/v1/products/42"));
        assert_eq!(payload.trace_id.as_deref(), Some("trace-404"));
        assert!(payload.details.is_empty());
    }

    #[tokio::test]
    async fn unexpected_failures_never_leak_detail() {
        let response = scope_request_context(test_context("trace-500", "/api/v1/products"), async {
            ApiError::Unexpected(anyhow::anyhow!("stack trace with secrets")).into_response()
        })
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, CODE_INTERNAL);
        assert!(!payload.message.contains("secrets"));
        assert_eq!(payload.message, "Unexpected error occurred");
    }

    #[tokio::test]
    async fn database_failures_are_normalized_like_unexpected_ones() {
        let response = ApiError::Database(DbErr::Custom("connection reset".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, CODE_INTERNAL);
        assert!(!payload.message.contains("connection reset"));
    }

    #[tokio::test]
    async fn validation_failures_carry_field_details() {
        let details = vec![
            FieldError::new("price", "decimal_scale", "price has more than 2 decimal places"),
            FieldError::new("currency", "length", "Currency must be a 3-letter code"),
        ];
        let response = ApiError::validation(details.clone()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, CODE_VALIDATION);
        assert_eq!(payload.details, details);
    }

    #[tokio::test]
    async fn trace_id_is_omitted_when_no_context_is_active() {
        let response = ApiError::not_found("missing").into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert!(payload.trace_id.is_none());
        assert!(payload.path.is_none());
    }

    #[tokio::test]
    async fn business_rule_uses_the_embedded_code() {
        let response = scope_request_context(test_context("trace-422", "/api/v1/products/7"), async {
            ApiError::business_rule("PRODUCT_VERSION_CONFLICT", "Product 7 was modified concurrently")
                .into_response()
        })
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.code, "PRODUCT_VERSION_CONFLICT");
        assert_eq!(payload.trace_id.as_deref(), Some("trace-422"));
    }
}
