//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::predictor::PredictorError;
use crate::screening::ValidationError;

/// Structured error response body for the mobile client.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Predictor timed out after {0}s")]
    PredictorTimeout(u64),
    #[error("Predictor unavailable: {0}")]
    PredictorUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::Validation(err) => {
                (StatusCode::BAD_REQUEST, "VALIDATION", err.to_string())
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::PredictorTimeout(secs) => {
                tracing::error!(timeout_secs = secs, "predictor timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "PREDICTOR_TIMEOUT",
                    "The prediction service did not respond in time".to_string(),
                )
            }
            ApiError::PredictorUnavailable(detail) => {
                tracing::error!(detail, "predictor unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "PREDICTOR_UNAVAILABLE",
                    "The prediction service is currently unavailable".to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

impl From<PredictorError> for ApiError {
    fn from(err: PredictorError) -> Self {
        match err {
            PredictorError::Timeout(secs) => ApiError::PredictorTimeout(secs),
            PredictorError::Unavailable(reason) => ApiError::PredictorUnavailable(reason),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, .. } => {
                ApiError::NotFound(format!("{entity_type} not found"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}
