//! Progressive slow-down for bursty clients. Delays, never rejects.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;

use super::client::client_key;
use crate::state::AppState;

pub async fn speed_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let limiter = state.speed_limiter();
    if limiter.is_enabled() {
        let key = client_key(&req);
        let delay = limiter.delay_for(&key, Utc::now());
        if !delay.is_zero() {
            state.metrics().record_delay(delay.as_millis() as u64);
            tracing::debug!(client = %key, delay_ms = delay.as_millis() as u64, "slowing client");
            tokio::time::sleep(delay).await;
        }
    }

    next.run(req).await
}
