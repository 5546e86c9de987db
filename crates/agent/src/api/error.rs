//! Defines the `ApiError` type that can be returned from an API handler, which
//! specifies an HTTP status code and wraps an `anyhow::Error`. It implements
//! `IntoResponse`, rendering the same `{"success": false, "error": ...}`
//! envelope as every other response of the API. `From` impls exist for the
//! typed errors the handlers produce, each with its status code.
use super::respond;
use crate::config::ConfigError;
use axum::http::StatusCode;
use models::PayloadError;

/// An error response
#[derive(Debug, thiserror::Error)]
#[error("status: {status}, error: {error}")]
pub struct ApiError {
    /// The HTTP status code
    pub status: StatusCode,
    /// The error message
    #[source]
    pub error: anyhow::Error,
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: anyhow::Error) -> ApiError {
        ApiError { status, error }
    }
}

impl From<PayloadError> for ApiError {
    fn from(error: PayloadError) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(error: ConfigError) -> Self {
        tracing::error!(%error, "API responding with configuration error");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            // alternate renders nested causes
            error: format!("{:#}", self.error),
        };
        respond(self.status, false, body)
    }
}
