//! Brickgate Server - booking admission and abuse-mitigation server.
//!
//! The admission logic lives in `brickgate-service`; `brickgate-http`
//! wires it into an axum router. This crate adds configuration and the
//! binary entry point.

pub mod config;

pub use brickgate_http::{AppState, router, serve};
pub use brickgate_service::{ServiceConfig, ServiceState};

/// Builds the HTTP state from parsed configuration.
pub fn app_state(config: &config::Config) -> AppState {
    AppState::new(
        ServiceState::new(&config.service_config()),
        config.cors_origins.clone(),
        config.body_limit,
    )
}
