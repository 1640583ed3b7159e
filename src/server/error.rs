//! Mapping from workflow failures to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::sessions::WorkflowError;

/// HTTP-facing error wrapper; the body is `{"error": "<message>"}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        let status = match &err {
            // Configuration errors are the client's to fix.
            WorkflowError::Compile(_) => StatusCode::BAD_REQUEST,
            WorkflowError::DuplicateSession { .. } => StatusCode::CONFLICT,
            WorkflowError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            WorkflowError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}
