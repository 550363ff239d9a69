//! Server configuration via CLI args and environment variables.

use std::time::Duration;

use brickgate_http::state::DEFAULT_BODY_LIMIT;
use brickgate_service::ServiceConfig;
use brickgate_service::janitor;
use brickgate_service::rate_limit::WindowPolicy;
use clap::Parser;

/// Admission and abuse-mitigation server for the booking endpoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "brickgate-server", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "BRICKGATE_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 5000, env = "BRICKGATE_PORT")]
    pub port: u16,

    /// CORS allowed origins (comma-separated). Empty for no CORS.
    #[arg(long, env = "BRICKGATE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "BRICKGATE_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: `text` or `json`.
    #[arg(long, default_value = "text", env = "BRICKGATE_LOG_FORMAT")]
    pub log_format: String,

    /// Requests per client per API window (0 = disabled).
    #[arg(long, default_value_t = 1000, env = "BRICKGATE_API_RATE_LIMIT")]
    pub api_rate_limit: u32,

    /// API rate-limit window in seconds.
    #[arg(long, default_value_t = 900, env = "BRICKGATE_API_RATE_WINDOW")]
    pub api_rate_window: u64,

    /// Requests per window before booking responses are slowed (0 = disabled).
    #[arg(long, default_value_t = 10, env = "BRICKGATE_SLOW_AFTER")]
    pub slow_after: u32,

    /// Added delay per request over the threshold, in milliseconds.
    #[arg(long, default_value_t = 500, env = "BRICKGATE_SLOW_STEP_MS")]
    pub slow_step_ms: u64,

    /// Delay ceiling in milliseconds.
    #[arg(long, default_value_t = 5000, env = "BRICKGATE_SLOW_MAX_MS")]
    pub slow_max_ms: u64,

    /// Booking attempts per IP per window (0 = disabled).
    #[arg(long, default_value_t = 100, env = "BRICKGATE_BOOKING_IP_LIMIT")]
    pub booking_ip_limit: u32,

    /// Booking IP window in seconds.
    #[arg(long, default_value_t = 3600, env = "BRICKGATE_BOOKING_IP_WINDOW")]
    pub booking_ip_window: u64,

    /// Booking attempts per phone number per window (0 = disabled).
    #[arg(long, default_value_t = 50, env = "BRICKGATE_BOOKING_PHONE_LIMIT")]
    pub booking_phone_limit: u32,

    /// Booking phone window in seconds.
    #[arg(long, default_value_t = 86_400, env = "BRICKGATE_BOOKING_PHONE_WINDOW")]
    pub booking_phone_window: u64,

    /// Lower bound of the random response delay, in milliseconds.
    #[arg(long, default_value_t = 100, env = "BRICKGATE_JITTER_MIN_MS")]
    pub jitter_min_ms: u64,

    /// Upper bound of the random response delay, in milliseconds.
    #[arg(long, default_value_t = 500, env = "BRICKGATE_JITTER_MAX_MS")]
    pub jitter_max_ms: u64,

    /// Seconds between stale-counter sweeps (at least 1).
    #[arg(
        long,
        default_value_t = janitor::SWEEP_INTERVAL.as_secs(),
        env = "BRICKGATE_JANITOR_INTERVAL",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub janitor_interval: u64,

    /// Maximum keys held per counter store.
    #[arg(long, default_value_t = 100_000, env = "BRICKGATE_MAX_TRACKED_KEYS")]
    pub max_tracked_keys: usize,

    /// Appointments accepted per time slot (0 = unlimited).
    #[arg(long, default_value_t = 3, env = "BRICKGATE_SLOT_CAPACITY")]
    pub slot_capacity: usize,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_BODY_LIMIT, env = "BRICKGATE_BODY_LIMIT")]
    pub body_limit: usize,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Admission settings for the service layer.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            api_rate_limit: self.api_rate_limit,
            api_rate_window: Duration::from_secs(self.api_rate_window),
            slow_after: self.slow_after,
            slow_step: Duration::from_millis(self.slow_step_ms),
            slow_max: Duration::from_millis(self.slow_max_ms),
            booking_ip: WindowPolicy::new(
                self.booking_ip_limit,
                Duration::from_secs(self.booking_ip_window),
            ),
            booking_phone: WindowPolicy::new(
                self.booking_phone_limit,
                Duration::from_secs(self.booking_phone_window),
            ),
            jitter_min: Duration::from_millis(self.jitter_min_ms),
            jitter_max: Duration::from_millis(self.jitter_max_ms),
            max_tracked_keys: self.max_tracked_keys,
            slot_capacity: self.slot_capacity,
        }
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval)
    }
}
