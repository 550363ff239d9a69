//! Brickgate Server entry point.

use std::net::SocketAddr;

use brickgate_service::janitor;
use tracing_subscriber::EnvFilter;

use brickgate_server::config::Config;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = brickgate_server::app_state(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        api_rate_limit = config.api_rate_limit,
        booking_ip_limit = config.booking_ip_limit,
        booking_phone_limit = config.booking_phone_limit,
        "Brickgate Server starting",
    );

    let app = brickgate_server::router(state.clone());

    let addr = SocketAddr::new(config.host.parse().expect("invalid host"), config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");

    let sweeper = janitor::spawn(state.service().clone(), config.janitor_interval());

    tracing::info!(%addr, "Brickgate Server ready");

    brickgate_server::serve(listener, app, shutdown_signal()).await;

    sweeper.abort();
    tracing::info!("Brickgate Server shut down");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install signal handler");
    tracing::info!("Shutdown signal received");
}
