//! Booking admission: per-client and per-phone attempt caps.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use brickgate_service::booking::LimitScope;
use brickgate_service::metrics::Rejection;
use chrono::Utc;

use super::client::client_key;
use super::form::BookingSubmission;
use crate::error::{ApiError, RetryAfter};
use crate::state::AppState;

pub const IP_LIMIT_MESSAGE: &str =
    "Too many booking attempts from this IP. Please try again later.";
pub const PHONE_LIMIT_MESSAGE: &str =
    "Too many booking attempts for this phone number. Please try again later.";

/// Returns 429 with an ISO-8601 `retryAfter` when either cap is hit.
pub async fn booking_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = client_key(&req);
    let phone = req
        .extensions()
        .get::<BookingSubmission>()
        .and_then(|BookingSubmission(form)| form.phone().map(str::to_owned));

    if let Err(denial) = state
        .booking_guard()
        .admit(&key, phone.as_deref(), Utc::now())
    {
        let (reason, message) = match denial.scope {
            LimitScope::Ip => (Rejection::BookingIp, IP_LIMIT_MESSAGE),
            LimitScope::Phone => (Rejection::BookingPhone, PHONE_LIMIT_MESSAGE),
        };
        state.metrics().record_rejection(reason);
        tracing::warn!(
            client = %key,
            scope = denial.scope.label(),
            retry_at = %denial.retry_at,
            "booking limit exceeded"
        );
        return Err(ApiError::TooManyRequests {
            message: message.to_owned(),
            retry_after: RetryAfter::At(denial.retry_at),
        });
    }

    Ok(next.run(req).await)
}
