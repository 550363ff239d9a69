//! Booking admission policy: independent caps per client and per phone.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::rate_limit::{Admission, FixedWindowStore, WindowPolicy};

/// Default per-client cap: 100 attempts per hour.
pub const IP_POLICY: WindowPolicy = WindowPolicy::new(100, Duration::from_secs(60 * 60));
/// Default per-phone cap: 50 attempts per 24 hours.
pub const PHONE_POLICY: WindowPolicy = WindowPolicy::new(50, Duration::from_secs(24 * 60 * 60));

/// Which counter refused the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Ip,
    Phone,
}

impl LimitScope {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ip => "ip",
            Self::Phone => "phone",
        }
    }
}

/// A refused booking attempt and when the refusing window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denial {
    pub scope: LimitScope,
    pub retry_at: DateTime<Utc>,
}

/// Per-client and per-phone booking attempt counters.
#[derive(Clone)]
pub struct BookingGuard {
    ip: FixedWindowStore,
    phone: FixedWindowStore,
}

impl BookingGuard {
    pub fn new(ip: WindowPolicy, phone: WindowPolicy, max_keys: usize) -> Self {
        Self {
            ip: FixedWindowStore::new("booking-ip", ip, max_keys),
            phone: FixedWindowStore::new("booking-phone", phone, max_keys),
        }
    }

    /// Records a booking attempt.
    ///
    /// The client counter is checked first; the phone counter is only
    /// touched when a phone number was submitted and the client passed.
    pub fn admit(
        &self,
        client_key: &str,
        phone: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), Denial> {
        if let Admission::Denied { retry_at } = self.ip.record_and_check(client_key, now) {
            return Err(Denial {
                scope: LimitScope::Ip,
                retry_at,
            });
        }

        if let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty())
            && let Admission::Denied { retry_at } = self.phone.record_and_check(phone, now)
        {
            return Err(Denial {
                scope: LimitScope::Phone,
                retry_at,
            });
        }

        Ok(())
    }

    pub fn ip_store(&self) -> &FixedWindowStore {
        &self.ip
    }

    pub fn phone_store(&self) -> &FixedWindowStore {
        &self.phone
    }

    /// Sweeps both stores, each by its own window length.
    pub fn sweep(&self, now: DateTime<Utc>) -> (usize, usize) {
        (self.ip.sweep(now), self.phone.sweep(now))
    }
}

impl Default for BookingGuard {
    fn default() -> Self {
        Self::new(IP_POLICY, PHONE_POLICY, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-02T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn hundred_and_first_attempt_from_one_client_is_refused() {
        let guard = BookingGuard::default();
        let start = t0();

        for i in 0..100 {
            let phone = format!("98{i:08}");
            let at = start + TimeDelta::seconds(i);
            assert!(guard.admit("1.2.3.4", Some(&phone), at).is_ok(), "attempt {i}");
        }

        let denial = guard
            .admit("1.2.3.4", Some("9811111111"), start + TimeDelta::minutes(30))
            .unwrap_err();
        assert_eq!(denial.scope, LimitScope::Ip);
        assert_eq!(denial.retry_at, start + TimeDelta::hours(1));
    }

    #[test]
    fn fifty_first_attempt_for_one_phone_is_refused() {
        let guard = BookingGuard::default();
        let start = t0();

        for i in 0..50 {
            let ip = format!("10.0.{}.{}", i / 256, i % 256);
            let at = start + TimeDelta::minutes(i);
            assert!(guard.admit(&ip, Some("9800000001"), at).is_ok(), "attempt {i}");
        }

        let denial = guard
            .admit("10.9.9.9", Some("9800000001"), start + TimeDelta::hours(20))
            .unwrap_err();
        assert_eq!(denial.scope, LimitScope::Phone);
        assert_eq!(denial.retry_at, start + TimeDelta::hours(24));
    }

    #[test]
    fn ip_refusal_leaves_phone_counter_untouched() {
        let guard = BookingGuard::new(
            WindowPolicy::new(1, Duration::from_secs(3600)),
            PHONE_POLICY,
            0,
        );
        guard.admit("1.2.3.4", Some("9800000001"), t0()).unwrap();
        guard.admit("1.2.3.4", Some("9800000001"), t0()).unwrap_err();

        assert_eq!(guard.phone_store().get("9800000001").unwrap().count, 1);
    }

    #[test]
    fn missing_or_blank_phone_skips_phone_counter() {
        let guard = BookingGuard::default();
        guard.admit("1.2.3.4", None, t0()).unwrap();
        guard.admit("1.2.3.4", Some("  "), t0()).unwrap();

        assert!(guard.phone_store().is_empty());
        assert_eq!(guard.ip_store().get("1.2.3.4").unwrap().count, 2);
    }

    #[test]
    fn phone_records_outlive_an_hour() {
        let guard = BookingGuard::default();
        let start = t0();
        guard.admit("1.2.3.4", Some("9800000001"), start).unwrap();

        let (ip_removed, phone_removed) = guard.sweep(start + TimeDelta::minutes(61));
        assert_eq!(ip_removed, 1);
        assert_eq!(phone_removed, 0);
        assert!(guard.phone_store().get("9800000001").is_some());
    }
}
