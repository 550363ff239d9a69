//! Brickgate Service: admission control core for the Brickgate booking server.
//!
//! This crate contains all transport-agnostic logic guarding the public
//! booking endpoint: counter stores, client key derivation, the booking
//! admission policy, speed limiting, honeypot and jitter defenses, the
//! janitor, and a minimal in-memory appointment book.
//!
//! The HTTP transport (`brickgate-http`) depends on this crate and wires
//! each piece into axum middleware.
//!
//! **Zero transport dependencies**: no axum, no HTTP types.

pub mod appointments;
pub mod booking;
pub mod client_key;
pub mod error;
pub mod honeypot;
pub mod janitor;
pub mod metrics;
pub mod rate_limit;
pub mod sliding;
pub mod speed;
pub mod timing;
pub mod types;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use appointments::AppointmentBook;
use booking::BookingGuard;
use metrics::{Metrics, StoreGauges};
use rate_limit::WindowPolicy;
use sliding::SlidingWindowLimiter;
use speed::SpeedLimiter;
use timing::ResponseJitter;

/// Configuration subset relevant to the service layer.
///
/// Transport-specific config (ports, CORS origins, body limits) stays in
/// the binary crate's `Config` struct.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub api_rate_limit: u32,
    pub api_rate_window: Duration,
    pub slow_after: u32,
    pub slow_step: Duration,
    pub slow_max: Duration,
    pub booking_ip: WindowPolicy,
    pub booking_phone: WindowPolicy,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub max_tracked_keys: usize,
    pub slot_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_rate_limit: 1000,
            api_rate_window: Duration::from_secs(15 * 60),
            slow_after: 10,
            slow_step: Duration::from_millis(500),
            slow_max: Duration::from_millis(5000),
            booking_ip: booking::IP_POLICY,
            booking_phone: booking::PHONE_POLICY,
            jitter_min: Duration::from_millis(100),
            jitter_max: Duration::from_millis(500),
            max_tracked_keys: 100_000,
            slot_capacity: 3,
        }
    }
}

impl ServiceConfig {
    /// Defaults with every delay switched off, for tests.
    pub fn without_delays() -> Self {
        Self {
            slow_after: 0,
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Entries removed by one janitor pass, per store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub api: usize,
    pub speed: usize,
    pub booking_ip: usize,
    pub booking_phone: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.api + self.speed + self.booking_ip + self.booking_phone
    }
}

/// Shared service state, cloneable across all transport handlers.
///
/// Every counter store is built once here and handed to the middleware
/// through this state; nothing lives in a process-wide static.
#[derive(Clone)]
pub struct ServiceState {
    inner: Arc<Inner>,
}

struct Inner {
    api_limiter: SlidingWindowLimiter,
    speed_limiter: SpeedLimiter,
    booking_guard: BookingGuard,
    jitter: ResponseJitter,
    appointments: AppointmentBook,
    metrics: Metrics,
    start_time: Instant,
}

impl ServiceState {
    /// Creates a new service state from config.
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                api_limiter: SlidingWindowLimiter::new(
                    config.api_rate_limit,
                    config.api_rate_window,
                    config.max_tracked_keys,
                ),
                speed_limiter: SpeedLimiter::new(
                    config.slow_after,
                    config.slow_step,
                    config.slow_max,
                    config.api_rate_window,
                    config.max_tracked_keys,
                ),
                booking_guard: BookingGuard::new(
                    config.booking_ip,
                    config.booking_phone,
                    config.max_tracked_keys,
                ),
                jitter: ResponseJitter::new(config.jitter_min, config.jitter_max),
                appointments: AppointmentBook::new(config.slot_capacity),
                metrics: Metrics::new(),
                start_time: Instant::now(),
            }),
        }
    }

    /// Creates a state with default limits and no artificial delays
    /// (for tests and ephemeral use).
    pub fn new_in_memory() -> Self {
        Self::new(&ServiceConfig::without_delays())
    }

    // --- Accessors ---

    pub fn api_limiter(&self) -> &SlidingWindowLimiter {
        &self.inner.api_limiter
    }

    pub fn speed_limiter(&self) -> &SpeedLimiter {
        &self.inner.speed_limiter
    }

    pub fn booking_guard(&self) -> &BookingGuard {
        &self.inner.booking_guard
    }

    pub fn jitter(&self) -> &ResponseJitter {
        &self.inner.jitter
    }

    pub fn appointments(&self) -> &AppointmentBook {
        &self.inner.appointments
    }

    pub fn metrics(&self) -> &Metrics {
        &self.inner.metrics
    }

    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    /// Keys currently held across all counter stores.
    pub fn tracked_keys(&self) -> usize {
        let g = self.store_gauges();
        g.api_keys + g.speed_keys + g.booking_ip_keys + g.booking_phone_keys
    }

    pub fn store_gauges(&self) -> StoreGauges {
        let guard = &self.inner.booking_guard;
        let speed = self.inner.speed_limiter.store();
        StoreGauges {
            api_keys: self.inner.api_limiter.tracked_keys(),
            speed_keys: speed.len(),
            booking_ip_keys: guard.ip_store().len(),
            booking_phone_keys: guard.phone_store().len(),
            evictions: self.inner.api_limiter.evictions()
                + speed.evictions()
                + guard.ip_store().evictions()
                + guard.phone_store().evictions(),
        }
    }

    /// Prometheus text for all admission metrics.
    pub fn render_metrics(&self) -> String {
        self.inner.metrics.render(&self.store_gauges())
    }

    // --- Maintenance ---

    /// Removes stale entries from every store, each by its own window.
    pub fn sweep_stale(&self, now: DateTime<Utc>) -> SweepReport {
        let (booking_ip, booking_phone) = self.inner.booking_guard.sweep(now);
        let report = SweepReport {
            api: self.inner.api_limiter.cleanup(now),
            speed: self.inner.speed_limiter.sweep(now),
            booking_ip,
            booking_phone,
        };
        self.inner.metrics.record_janitor_sweep(report.total());
        report
    }
}
