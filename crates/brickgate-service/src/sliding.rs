//! Sliding-window request limiter for general API traffic.
//!
//! Approximates a true sliding log with two adjacent fixed windows: the
//! previous window's count is weighted by how much of it still overlaps
//! the sliding interval ending at `now`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::rate_limit::{evict_oldest, headroom_target, window_delta};

/// Result of one check, with the numbers needed for `RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct SlidingEntry {
    window_start: DateTime<Utc>,
    current: u32,
    previous: u32,
}

impl SlidingEntry {
    fn rotate(&mut self, now: DateTime<Utc>, window: TimeDelta) {
        let elapsed = now - self.window_start;
        if elapsed >= window.checked_mul(2).unwrap_or(TimeDelta::MAX) {
            self.previous = 0;
            self.current = 0;
            self.window_start = now;
        } else if elapsed >= window {
            self.previous = self.current;
            self.current = 0;
            self.window_start += window;
        }
    }

    fn weighted(&self, now: DateTime<Utc>, window: TimeDelta) -> f64 {
        let elapsed = (now - self.window_start).num_milliseconds() as f64;
        let span = window.num_milliseconds().max(1) as f64;
        let overlap = 1.0 - (elapsed / span).clamp(0.0, 1.0);
        f64::from(self.previous) * overlap + f64::from(self.current)
    }
}

/// In-memory sliding-window limiter keyed by client key.
#[derive(Clone)]
pub struct SlidingWindowLimiter {
    inner: Arc<SlidingInner>,
}

struct SlidingInner {
    limit: u32,
    window: Duration,
    window_delta: TimeDelta,
    /// Upper bound on tracked keys. `0` means unbounded.
    max_keys: usize,
    counters: DashMap<String, SlidingEntry>,
    evictions: AtomicU64,
}

impl SlidingWindowLimiter {
    /// Creates a new limiter. `limit = 0` means disabled, `max_keys = 0`
    /// means no key bound.
    pub fn new(limit: u32, window: Duration, max_keys: usize) -> Self {
        Self {
            inner: Arc::new(SlidingInner {
                limit,
                window,
                window_delta: window_delta(window),
                max_keys,
                counters: DashMap::new(),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.limit > 0
    }

    pub fn limit(&self) -> u32 {
        self.inner.limit
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    /// Human-readable window length, e.g. `"15 minutes"`.
    pub fn window_label(&self) -> String {
        describe_duration(self.inner.window)
    }

    /// Counts a request for `key` if it fits under the limit.
    ///
    /// Rejected requests are not counted, so a client that backs off
    /// recovers as the window slides.
    pub fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitStatus {
        let limit = self.inner.limit;
        if limit == 0 {
            return RateLimitStatus {
                allowed: true,
                limit,
                remaining: 0,
                reset_after: Duration::ZERO,
            };
        }

        self.make_room(key, now);

        let window = self.inner.window_delta;
        let mut entry = self
            .inner
            .counters
            .entry(key.to_owned())
            .or_insert(SlidingEntry {
                window_start: now,
                current: 0,
                previous: 0,
            });
        let entry = entry.value_mut();
        entry.rotate(now, window);

        let reset_after = (entry.window_start + window - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        let projected = entry.weighted(now, window) + 1.0;

        if projected > f64::from(limit) {
            return RateLimitStatus {
                allowed: false,
                limit,
                remaining: 0,
                reset_after,
            };
        }

        entry.current += 1;
        let used = projected.ceil() as u32;
        RateLimitStatus {
            allowed: true,
            limit,
            remaining: limit.saturating_sub(used),
            reset_after,
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.inner.counters.len()
    }

    /// Total entries dropped to stay under the key bound.
    pub fn evictions(&self) -> u64 {
        self.inner.evictions.load(Ordering::Relaxed)
    }

    /// Drops entries idle for two full windows. Returns count removed.
    pub fn cleanup(&self, now: DateTime<Utc>) -> usize {
        let horizon = self.inner.window_delta.checked_mul(2).unwrap_or(TimeDelta::MAX);
        let before = self.inner.counters.len();
        self.inner
            .counters
            .retain(|_, entry| now - entry.window_start < horizon);
        before.saturating_sub(self.inner.counters.len())
    }

    /// Same policy as the fixed-window stores: sweep idle keys, then evict
    /// the oldest windows in one batch if still full.
    fn make_room(&self, key: &str, now: DateTime<Utc>) {
        let max_keys = self.inner.max_keys;
        if max_keys == 0
            || self.inner.counters.len() < max_keys
            || self.inner.counters.contains_key(key)
        {
            return;
        }

        let swept = self.cleanup(now);
        if swept > 0 {
            tracing::debug!(store = "api", swept, "forced sweep at key bound");
        }
        if self.inner.counters.len() < max_keys {
            return;
        }

        let evicted = evict_oldest(&self.inner.counters, headroom_target(max_keys), |e| {
            e.window_start
        });
        if evicted > 0 {
            self.inner
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::warn!(
                store = "api",
                evicted,
                "key bound reached, evicted oldest entries"
            );
        }
    }
}

/// Formats a duration as whole hours, minutes or seconds.
pub fn describe_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (n, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}
