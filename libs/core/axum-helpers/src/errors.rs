use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Body of every non-2xx response.
///
/// ```json
/// { "error": "INVALID_TOKEN", "message": "Invalid or expired token" }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable identifier.
    pub error: String,
    /// Human-readable message, safe to show to end users.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    ErrorResponse::new("NOT_FOUND", "The requested resource was not found")
        .into_response_with(StatusCode::NOT_FOUND)
}
