//! Random delay before the booking handler runs.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::state::AppState;

/// Waits a jittered interval on every request, then forwards it.
pub async fn response_jitter_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let waited = state.jitter().wait().await;
    tracing::trace!(waited_ms = waited.as_millis() as u64, "response jitter applied");
    next.run(req).await
}
