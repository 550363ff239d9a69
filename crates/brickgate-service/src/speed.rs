//! Progressive-delay ("slow down") limiter.
//!
//! Counts requests per client in a fixed window and, past a soft threshold,
//! asks the caller to wait before forwarding. Never rejects.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::rate_limit::{FixedWindowStore, WindowPolicy};

#[derive(Clone)]
pub struct SpeedLimiter {
    delay_after: u32,
    step: Duration,
    max_delay: Duration,
    hits: FixedWindowStore,
}

impl SpeedLimiter {
    /// Creates a speed limiter. `delay_after = 0` means disabled.
    pub fn new(
        delay_after: u32,
        step: Duration,
        max_delay: Duration,
        window: Duration,
        max_keys: usize,
    ) -> Self {
        Self {
            delay_after,
            step,
            max_delay,
            hits: FixedWindowStore::new("speed", WindowPolicy::new(delay_after, window), max_keys),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.delay_after > 0
    }

    /// Counts a request for `key` and returns how long to hold it.
    pub fn delay_for(&self, key: &str, now: DateTime<Utc>) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let record = self.hits.hit(key, now);
        progressive_delay(record.count, self.delay_after, self.step, self.max_delay)
    }

    pub fn store(&self) -> &FixedWindowStore {
        &self.hits
    }

    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        self.hits.sweep(now)
    }
}

/// `step × (count − delay_after)` once over the threshold, capped at `max`.
pub fn progressive_delay(count: u32, delay_after: u32, step: Duration, max: Duration) -> Duration {
    if count <= delay_after {
        return Duration::ZERO;
    }
    step.saturating_mul(count - delay_after).min(max)
}
