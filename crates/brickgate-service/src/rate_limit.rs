//! Fixed-window attempt counters keyed by client key or phone number.
//!
//! Transport-agnostic core. Each transport crate wires its own middleware
//! to derive keys and call `record_and_check()`.
//!
//! Every read-modify-write holds the map's entry guard, so a single key is
//! never double-counted within one process. Replicas keep independent
//! counters; the effective cap of a deployment is `cap * replicas`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

/// Longest window a store accepts (100 years). Longer windows are clamped so
/// `window_start + window` stays representable.
pub const MAX_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A full store frees `max_keys / EVICTION_DIVISOR` slots at once.
const EVICTION_DIVISOR: usize = 20;

pub(crate) fn window_delta(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window.min(MAX_WINDOW)).unwrap_or(TimeDelta::MAX)
}

/// Size a full store is brought back down to, leaving room for a batch of
/// new keys before the bound is hit again.
pub(crate) fn headroom_target(max_keys: usize) -> usize {
    max_keys - (max_keys / EVICTION_DIVISOR).max(1)
}

/// Removes the entries with the oldest window starts until at most `target`
/// remain. Returns the number removed.
pub(crate) fn evict_oldest<V>(
    map: &DashMap<String, V>,
    target: usize,
    window_start: impl Fn(&V) -> DateTime<Utc>,
) -> usize {
    if map.len() <= target {
        return 0;
    }

    let mut by_age: Vec<(DateTime<Utc>, String)> = map
        .iter()
        .map(|r| (window_start(r.value()), r.key().clone()))
        .collect();
    let excess = by_age.len().saturating_sub(target);
    if excess < by_age.len() {
        by_age.select_nth_unstable_by_key(excess, |(start, _)| *start);
    }
    by_age.truncate(excess);

    by_age
        .into_iter()
        .filter(|(_, key)| map.remove(key).is_some())
        .count()
}

/// Cap and window length for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Maximum attempts per window. `0` disables the store.
    pub cap: u32,
    pub window: Duration,
}

impl WindowPolicy {
    pub const fn new(cap: u32, window: Duration) -> Self {
        Self { cap, window }
    }
}

/// Attempts seen since `window_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Outcome of recording one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed { count: u32 },
    Denied { retry_at: DateTime<Utc> },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// In-memory fixed-window counter store.
///
/// Cloning is cheap; all clones share the same counters.
#[derive(Clone)]
pub struct FixedWindowStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    name: &'static str,
    policy: WindowPolicy,
    window: TimeDelta,
    /// Upper bound on tracked keys. `0` means unbounded.
    max_keys: usize,
    records: DashMap<String, AttemptRecord>,
    evictions: AtomicU64,
}

impl FixedWindowStore {
    /// Creates a store. `name` only labels log lines.
    pub fn new(name: &'static str, policy: WindowPolicy, max_keys: usize) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                name,
                policy,
                window: window_delta(policy.window),
                max_keys,
                records: DashMap::new(),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.policy.cap > 0
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn policy(&self) -> WindowPolicy {
        self.inner.policy
    }

    /// Records an attempt for `key` and checks it against the cap.
    ///
    /// A window that has run its full length is replaced by a fresh one
    /// starting at `now`, even if the old window was over the cap.
    pub fn record_and_check(&self, key: &str, now: DateTime<Utc>) -> Admission {
        if !self.is_enabled() {
            return Admission::Allowed { count: 0 };
        }

        self.make_room(key, now);

        let cap = self.inner.policy.cap;
        let window = self.inner.window;
        let mut entry = self
            .inner
            .records
            .entry(key.to_owned())
            .or_insert(AttemptRecord {
                count: 0,
                window_start: now,
            });
        let record = entry.value_mut();

        if now - record.window_start >= window {
            *record = AttemptRecord {
                count: 1,
                window_start: now,
            };
            Admission::Allowed { count: 1 }
        } else if record.count < cap {
            record.count += 1;
            Admission::Allowed {
                count: record.count,
            }
        } else {
            Admission::Denied {
                retry_at: record.window_start + window,
            }
        }
    }

    /// Counts an attempt without enforcing the cap. Returns the updated record.
    pub fn hit(&self, key: &str, now: DateTime<Utc>) -> AttemptRecord {
        self.make_room(key, now);

        let window = self.inner.window;
        let mut entry = self
            .inner
            .records
            .entry(key.to_owned())
            .or_insert(AttemptRecord {
                count: 0,
                window_start: now,
            });
        let record = entry.value_mut();

        if now - record.window_start >= window {
            *record = AttemptRecord {
                count: 1,
                window_start: now,
            };
        } else {
            record.count = record.count.saturating_add(1);
        }
        *record
    }

    /// Returns a snapshot of the record for `key`.
    pub fn get(&self, key: &str) -> Option<AttemptRecord> {
        self.inner.records.get(key).map(|r| *r.value())
    }

    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Total entries dropped to stay under the key bound.
    pub fn evictions(&self) -> u64 {
        self.inner.evictions.load(Ordering::Relaxed)
    }

    /// Removes records whose window has fully elapsed. Returns count removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let window = self.inner.window;
        let mut removed = 0;
        self.inner.records.retain(|_, record| {
            let live = now - record.window_start < window;
            if !live {
                removed += 1;
            }
            live
        });
        removed
    }

    /// Keeps the store under `max_keys` before a new key is inserted.
    ///
    /// At the bound, stale records are swept first. If the store is still
    /// full, the oldest windows are evicted in one batch down to
    /// `headroom_target(max_keys)`.
    ///
    /// Must not be called while holding an entry guard on `records`.
    fn make_room(&self, key: &str, now: DateTime<Utc>) {
        let max_keys = self.inner.max_keys;
        if max_keys == 0
            || self.inner.records.len() < max_keys
            || self.inner.records.contains_key(key)
        {
            return;
        }

        let swept = self.sweep(now);
        if swept > 0 {
            tracing::debug!(store = self.name(), swept, "forced sweep at key bound");
        }

        if self.inner.records.len() < max_keys {
            return;
        }

        let evicted = evict_oldest(&self.inner.records, headroom_target(max_keys), |r| {
            r.window_start
        });
        if evicted > 0 {
            self.inner
                .evictions
                .fetch_add(evicted as u64, Ordering::Relaxed);
            tracing::warn!(
                store = self.name(),
                evicted,
                "key bound reached, evicted oldest entries"
            );
        }
    }
}
