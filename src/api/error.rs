//! API error types with `{ "error": string }` JSON bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::interpretation::InterpretationError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Gemini API key not set.")]
    MissingApiKey,
    #[error("File size must be less than 10MB.")]
    PayloadTooLarge,
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<InterpretationError> for ApiError {
    fn from(err: InterpretationError) -> Self {
        match err {
            InterpretationError::MissingText => ApiError::BadRequest(err.to_string()),
            InterpretationError::MissingApiKey => ApiError::MissingApiKey,
            other => ApiError::Internal(other.client_message()),
        }
    }
}
