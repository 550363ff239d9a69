//! HTTP application state: wraps `ServiceState` with HTTP-specific fields.
//!
//! `AppState` provides transparent access to all `ServiceState` methods
//! via `Deref`, and adds transport-specific config like CORS origins and
//! the request body limit.

use std::ops::Deref;
use std::sync::Arc;

use brickgate_service::{ServiceConfig, ServiceState};

/// Default cap on buffered booking bodies (10 MiB, room for a few photos).
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Shared HTTP application state, cloneable across handlers.
///
/// Wraps `ServiceState` (admission logic) and adds HTTP-specific fields.
/// All `ServiceState` methods are available directly via `Deref`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppInner>,
}

struct AppInner {
    service: ServiceState,
    cors_origins: Vec<String>,
    body_limit: usize,
}

impl Deref for AppState {
    type Target = ServiceState;

    fn deref(&self) -> &ServiceState {
        &self.inner.service
    }
}

impl AppState {
    /// Creates a new HTTP application state.
    pub fn new(service: ServiceState, cors_origins: Vec<String>, body_limit: usize) -> Self {
        Self {
            inner: Arc::new(AppInner {
                service,
                cors_origins,
                body_limit,
            }),
        }
    }

    /// Creates an in-memory state with no artificial delays (for tests).
    pub fn new_in_memory() -> Self {
        Self::new(ServiceState::new_in_memory(), vec![], DEFAULT_BODY_LIMIT)
    }

    /// Creates an in-memory state from explicit limits (for tests).
    pub fn with_config(config: &ServiceConfig) -> Self {
        Self::new(ServiceState::new(config), vec![], DEFAULT_BODY_LIMIT)
    }

    /// Returns the configured CORS allowed origins.
    pub fn cors_origins(&self) -> &[String] {
        &self.inner.cors_origins
    }

    /// Maximum accepted request body size in bytes.
    pub fn body_limit(&self) -> usize {
        self.inner.body_limit
    }

    /// Returns a reference to the underlying service state.
    pub fn service(&self) -> &ServiceState {
        &self.inner.service
    }
}
