use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    Unauthorized,
    /// Query credentials are missing or the startup probe failed.
    Disabled,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ValidationError(msg) => {
                tracing::warn!(validation_error = %msg, "Validation failed");
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(msg))).into_response()
            }
            AppError::Unauthorized => {
                tracing::warn!("Rejected request with a missing or invalid API key");
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new("Invalid or missing API key")),
                )
                    .into_response()
            }
            AppError::Disabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::with_details(
                    "Admin requests are disabled",
                    "The voice server query login is not configured or could not be verified",
                )),
            )
                .into_response(),
        }
    }
}

impl From<crate::validation::ValidationError> for AppError {
    fn from(err: crate::validation::ValidationError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
