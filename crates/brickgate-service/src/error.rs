//! Service-layer error types.
//!
//! `ServiceError` is transport-agnostic. The HTTP transport maps it to
//! status codes and JSON bodies.

/// Service error shared across transports.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Submitted data is missing or invalid.
    #[error("{0}")]
    BadRequest(String),

    /// The requested slot or resource is already taken.
    #[error("{0}")]
    Conflict(String),
}
