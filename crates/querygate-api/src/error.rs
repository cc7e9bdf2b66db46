//! API error types and JSON error response formatting.
//!
//! Every error leaves the service as `{error, message}` with a matching
//! status code. Workflow internals never reach this layer; only request
//! validation failures do.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use querygate_core::QuerygateError;
use querygate_workflow::WorkflowError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "unknown_role").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 - missing or invalid parameters.
    BadRequest(String),
    /// 400 - role outside the policy table.
    UnknownRole(String),
    /// 404 - resource does not exist.
    NotFound(String),
    /// 422 - body could not be parsed into a request.
    UnprocessableEntity(String),
    /// 500 - unexpected server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::UnknownRole(role) => (
                StatusCode::BAD_REQUEST,
                "unknown_role",
                format!("Unknown role: {}", role),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            WorkflowError::UnknownRole(role) => ApiError::UnknownRole(role),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<QuerygateError> for ApiError {
    fn from(err: QuerygateError) -> Self {
        match err {
            QuerygateError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            QuerygateError::UnknownRole(role) => ApiError::UnknownRole(role),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::UnprocessableEntity(rejection.body_text())
    }
}
