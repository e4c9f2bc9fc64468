//! API errors
//!
//! Every failure leaves the server as `{"error": "<message>"}` with the
//! matching status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by API handlers
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or wrong `X-API-Key`
    #[error("Unauthorized")]
    Unauthorized,

    /// Malformed or invalid request
    #[error("{0}")]
    BadRequest(String),

    /// Key id out of range, or key not in the required state
    #[error("{0}")]
    NotFound(String),

    /// Key could not be added
    #[error("{0}")]
    Conflict(String),

    /// Anything else
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref details) = self {
            tracing::error!("Request failed: {}", details);
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
