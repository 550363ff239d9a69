//! Lightweight Prometheus-compatible metrics using atomic counters.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Why a request was turned away.
#[derive(Clone, Copy)]
pub enum Rejection {
    /// General API limiter.
    ApiLimit,
    BookingIp,
    BookingPhone,
    Honeypot,
}

impl Rejection {
    pub fn label(self) -> &'static str {
        match self {
            Self::ApiLimit => "api_limit",
            Self::BookingIp => "booking_ip",
            Self::BookingPhone => "booking_phone",
            Self::Honeypot => "honeypot",
        }
    }
}

const ALL_REJECTIONS: [Rejection; 4] = [
    Rejection::ApiLimit,
    Rejection::BookingIp,
    Rejection::BookingPhone,
    Rejection::Honeypot,
];

/// Store sizes sampled at render time.
pub struct StoreGauges {
    pub api_keys: usize,
    pub speed_keys: usize,
    pub booking_ip_keys: usize,
    pub booking_phone_keys: usize,
    pub evictions: u64,
}

/// Application-wide admission metrics.
pub struct Metrics {
    admitted_total: AtomicU64,
    rejected_api_limit: AtomicU64,
    rejected_booking_ip: AtomicU64,
    rejected_booking_phone: AtomicU64,
    rejected_honeypot: AtomicU64,
    delayed_total: AtomicU64,
    /// Accumulated speed-limiter delay in milliseconds.
    delay_ms_sum: AtomicU64,
    bookings_created: AtomicU64,
    janitor_removed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            admitted_total: AtomicU64::new(0),
            rejected_api_limit: AtomicU64::new(0),
            rejected_booking_ip: AtomicU64::new(0),
            rejected_booking_phone: AtomicU64::new(0),
            rejected_honeypot: AtomicU64::new(0),
            delayed_total: AtomicU64::new(0),
            delay_ms_sum: AtomicU64::new(0),
            bookings_created: AtomicU64::new(0),
            janitor_removed: AtomicU64::new(0),
        }
    }

    fn rejection(&self, reason: Rejection) -> &AtomicU64 {
        match reason {
            Rejection::ApiLimit => &self.rejected_api_limit,
            Rejection::BookingIp => &self.rejected_booking_ip,
            Rejection::BookingPhone => &self.rejected_booking_phone,
            Rejection::Honeypot => &self.rejected_honeypot,
        }
    }

    /// A request passed the general API limiter.
    pub fn record_admitted(&self) {
        self.admitted_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self, reason: Rejection) {
        self.rejection(reason).fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delay(&self, delay_ms: u64) {
        self.delayed_total.fetch_add(1, Ordering::Relaxed);
        self.delay_ms_sum.fetch_add(delay_ms, Ordering::Relaxed);
    }

    pub fn record_booking(&self) {
        self.bookings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_janitor_sweep(&self, removed: usize) {
        self.janitor_removed
            .fetch_add(removed as u64, Ordering::Relaxed);
    }

    pub fn rejected(&self, reason: Rejection) -> u64 {
        self.rejection(reason).load(Ordering::Relaxed)
    }

    pub fn bookings_created(&self) -> u64 {
        self.bookings_created.load(Ordering::Relaxed)
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self, stores: &StoreGauges) -> String {
        let mut out = String::with_capacity(2048);

        writeln!(
            out,
            "# HELP brickgate_requests_admitted_total Requests past the API limiter."
        )
        .unwrap();
        writeln!(out, "# TYPE brickgate_requests_admitted_total counter").unwrap();
        writeln!(
            out,
            "brickgate_requests_admitted_total {}",
            self.admitted_total.load(Ordering::Relaxed)
        )
        .unwrap();

        writeln!(
            out,
            "# HELP brickgate_requests_rejected_total Requests refused by admission checks."
        )
        .unwrap();
        writeln!(out, "# TYPE brickgate_requests_rejected_total counter").unwrap();
        for reason in ALL_REJECTIONS {
            writeln!(
                out,
                "brickgate_requests_rejected_total{{reason=\"{}\"}} {}",
                reason.label(),
                self.rejected(reason)
            )
            .unwrap();
        }

        writeln!(
            out,
            "# HELP brickgate_requests_delayed_total Requests slowed by the speed limiter."
        )
        .unwrap();
        writeln!(out, "# TYPE brickgate_requests_delayed_total counter").unwrap();
        writeln!(
            out,
            "brickgate_requests_delayed_total {}",
            self.delayed_total.load(Ordering::Relaxed)
        )
        .unwrap();

        writeln!(out, "# HELP brickgate_delay_seconds_sum Total speed-limiter delay.").unwrap();
        writeln!(out, "# TYPE brickgate_delay_seconds_sum counter").unwrap();
        writeln!(
            out,
            "brickgate_delay_seconds_sum {:.3}",
            self.delay_ms_sum.load(Ordering::Relaxed) as f64 / 1000.0
        )
        .unwrap();

        writeln!(out, "# HELP brickgate_bookings_created_total Appointments created.").unwrap();
        writeln!(out, "# TYPE brickgate_bookings_created_total counter").unwrap();
        writeln!(out, "brickgate_bookings_created_total {}", self.bookings_created()).unwrap();

        writeln!(
            out,
            "# HELP brickgate_janitor_removed_total Stale counter entries swept."
        )
        .unwrap();
        writeln!(out, "# TYPE brickgate_janitor_removed_total counter").unwrap();
        writeln!(
            out,
            "brickgate_janitor_removed_total {}",
            self.janitor_removed.load(Ordering::Relaxed)
        )
        .unwrap();

        writeln!(
            out,
            "# HELP brickgate_store_evictions_total Entries dropped at the key bound."
        )
        .unwrap();
        writeln!(out, "# TYPE brickgate_store_evictions_total counter").unwrap();
        writeln!(out, "brickgate_store_evictions_total {}", stores.evictions).unwrap();

        writeln!(out, "# HELP brickgate_tracked_keys Keys held per counter store.").unwrap();
        writeln!(out, "# TYPE brickgate_tracked_keys gauge").unwrap();
        for (store, keys) in [
            ("api", stores.api_keys),
            ("speed", stores.speed_keys),
            ("booking_ip", stores.booking_ip_keys),
            ("booking_phone", stores.booking_phone_keys),
        ] {
            writeln!(out, "brickgate_tracked_keys{{store=\"{store}\"}} {keys}").unwrap();
        }

        out
    }
}
