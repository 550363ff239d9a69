//! General API rate limiting with standard `RateLimit-*` headers.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use brickgate_service::metrics::Rejection;
use brickgate_service::sliding::RateLimitStatus;
use chrono::Utc;

use super::client::attach_client_key;
use crate::error::{ApiError, RetryAfter};
use crate::state::AppState;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

pub const API_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

fn set_rate_limit_headers(headers: &mut HeaderMap, status: &RateLimitStatus) {
    let reset = status.reset_after;
    let reset_secs = reset.as_secs() + u64::from(reset.subsec_nanos() > 0);
    headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(status.limit));
    headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(status.remaining));
    headers.insert(RATELIMIT_RESET.clone(), HeaderValue::from(reset_secs));
}

/// Sliding-window limiter over all API traffic. Returns 429 past the limit.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let limiter = state.api_limiter();
    if !limiter.is_enabled() {
        return next.run(req).await;
    }

    let key = attach_client_key(&mut req);
    let status = limiter.check(&key, Utc::now());

    if !status.allowed {
        state.metrics().record_rejection(Rejection::ApiLimit);
        tracing::warn!(client = %key, path = %req.uri().path(), "API rate limit exceeded");

        let mut response = ApiError::TooManyRequests {
            message: API_LIMIT_MESSAGE.to_owned(),
            retry_after: RetryAfter::Window {
                label: limiter.window_label(),
                reset_after: status.reset_after,
            },
        }
        .into_response();
        set_rate_limit_headers(response.headers_mut(), &status);
        return response;
    }

    state.metrics().record_admitted();
    let mut response = next.run(req).await;
    set_rate_limit_headers(response.headers_mut(), &status);
    response
}
