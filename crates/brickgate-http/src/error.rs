//! HTTP error type and JSON error bodies.
//!
//! Every rejection uses the same body shape the booking frontend reads:
//! `{ "success": false, "message": ..., "retryAfter": ... }`.

use std::time::Duration;

use axum::http::header::RETRY_AFTER;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use brickgate_service::error::ServiceError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Generic message for honeypot trips; never says which field fired.
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request detected.";

/// When a rate-limited client may try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryAfter {
    /// Rolling limiter: reported as a window label such as `"15 minutes"`.
    Window { label: String, reset_after: Duration },
    /// Fixed window: reported as the ISO-8601 instant the window closes.
    At(DateTime<Utc>),
}

impl RetryAfter {
    fn body_value(&self) -> String {
        match self {
            Self::Window { label, .. } => label.clone(),
            Self::At(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Whole seconds for the `Retry-After` header, rounded up.
    fn header_secs(&self) -> u64 {
        let wait = match self {
            Self::Window { reset_after, .. } => *reset_after,
            Self::At(at) => (*at - Utc::now()).to_std().unwrap_or(Duration::ZERO),
        };
        wait.as_secs() + u64::from(wait.subsec_nanos() > 0)
    }
}

/// API error returned by middleware and handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An admission limit was exceeded.
    #[error("{message}")]
    TooManyRequests {
        message: String,
        retry_after: RetryAfter,
    },

    /// Honeypot tripped.
    #[error("invalid request detected")]
    InvalidRequest,

    /// Body could not be decoded or failed validation.
    #[error("{0}")]
    BadRequest(String),

    #[error("request body too large")]
    PayloadTooLarge,

    /// Requested slot is taken.
    #[error("{0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::BadRequest(msg) => Self::BadRequest(msg),
            ServiceError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `false`.
    pub(crate) success: bool,
    /// Human-readable reason.
    pub(crate) message: String,
    /// Window label or ISO-8601 timestamp, present on 429 only.
    #[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
    pub(crate) retry_after: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, retry_after) = match self {
            ApiError::TooManyRequests {
                message,
                retry_after,
            } => (StatusCode::TOO_MANY_REQUESTS, message, Some(retry_after)),
            ApiError::InvalidRequest => {
                (StatusCode::BAD_REQUEST, INVALID_REQUEST_MESSAGE.to_owned(), None)
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large.".to_owned(),
                None,
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal(msg) => {
                tracing::error!(%msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error.".to_owned(),
                    None,
                )
            }
        };

        let body = ErrorBody {
            success: false,
            message,
            retry_after: retry_after.as_ref().map(RetryAfter::body_value),
        };
        let mut response = (status, axum::Json(body)).into_response();

        if let Some(retry_after) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after.header_secs()));
        }
        response
    }
}
