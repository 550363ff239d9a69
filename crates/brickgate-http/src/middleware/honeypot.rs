//! Rejects submissions that fill in hidden decoy fields.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use brickgate_service::honeypot;
use brickgate_service::metrics::Rejection;

use super::client::client_key;
use super::form::BookingSubmission;
use crate::error::ApiError;
use crate::state::AppState;

/// Returns 400 with a generic body if any honeypot field is non-blank.
pub async fn honeypot_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(BookingSubmission(form)) = req.extensions().get::<BookingSubmission>()
        && honeypot::is_tripped(form)
    {
        state.metrics().record_rejection(Rejection::Honeypot);
        tracing::warn!(client = %client_key(&req), "honeypot field filled, rejecting");
        return Err(ApiError::InvalidRequest);
    }

    Ok(next.run(req).await)
}
