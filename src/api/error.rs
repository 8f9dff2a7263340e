//! Error type for the route layer.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::database::StoreError;
use crate::upload::{COOLDOWN, UploadError};

/// Errors a handler can return. Each maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Storage API exhausted. `minutes` is the remaining cooldown when known.
    #[error("storage rate limit exceeded")]
    RateLimited { minutes: Option<i64> },

    /// Only `context` reaches the client; `error` is logged.
    #[error("{context}: {error}")]
    Internal {
        context: &'static str,
        error: anyhow::Error,
    },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(context: &'static str, error: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            context,
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::RateLimited { minutes: Some(minutes) } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("GitHub rate limit exceeded. Try again in {minutes} minutes."),
                Some(minutes * 60),
            ),
            ApiError::RateLimited { minutes: None } => (
                StatusCode::TOO_MANY_REQUESTS,
                "GitHub rate limit exceeded. Try again later.".to_string(),
                Some(COOLDOWN.num_seconds()),
            ),
            ApiError::Internal { context, error } => {
                error!("{context}: {error:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string(), None)
            }
        };

        let mut response = (status, Json(json!({ "message": message }))).into_response();
        if let Some(seconds) = retry_after
            && let Ok(value) = HeaderValue::from_str(&seconds.to_string())
        {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::internal("Internal server error.", err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingFile => ApiError::bad_request("No file uploaded"),
            UploadError::TooLarge => ApiError::bad_request("File too large. Maximum 10MB."),
            UploadError::UnsupportedType(_) => ApiError::bad_request(
                "Unsupported file type. Allowed: pdf, ppt, pptx, doc, docx, jpg, jpeg, png",
            ),
            UploadError::RateLimited { minutes } => ApiError::RateLimited { minutes },
            UploadError::UserNotFound => ApiError::not_found("User not found"),
            UploadError::ChannelNotFound => ApiError::not_found("Channel not found"),
            UploadError::Storage(e) => ApiError::internal("Failed to upload file.", e),
            UploadError::Store(e) => ApiError::internal("Failed to upload file.", e),
        }
    }
}
