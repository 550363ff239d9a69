//! Client key derivation for rate-limit counters.
//!
//! Carrier-grade NAT puts many phones behind one address. Mobile user agents
//! are spread over a bounded number of buckets per address so one busy
//! carrier IP does not lock out every phone behind it.

use std::net::IpAddr;

/// Number of per-IP buckets for mobile user agents.
pub const MOBILE_BUCKETS: u32 = 10_000;

/// Lowercase substrings that mark a mobile browser.
const MOBILE_MARKERS: [&str; 8] = [
    "mobile",
    "android",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

/// Resolves the client IP as a string.
///
/// The first entry of `X-Forwarded-For` wins (single reverse-proxy hop),
/// then the socket peer, then the literal `unknown`.
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<IpAddr>) -> String {
    if let Some(xff) = forwarded_for
        && let Some(first) = xff.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_owned();
        }
    }

    peer.map_or_else(|| "unknown".to_owned(), |ip| ip.to_string())
}

pub fn is_mobile(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    MOBILE_MARKERS.iter().any(|marker| ua.contains(marker))
}

/// Shift-and-subtract accumulator (`h * 31 + unit`) over UTF-16 code units,
/// in wrapping 32-bit arithmetic, reduced to `0..MOBILE_BUCKETS`.
///
/// Load spreading only. It is trivially collidable and must not be used
/// to identify anyone.
pub fn user_agent_bucket(user_agent: &str) -> u32 {
    let hash = user_agent.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    });
    hash.unsigned_abs() % MOBILE_BUCKETS
}

/// Builds the counter key: `<ip>` or `<ip>-mobile-<bucket>`.
pub fn derive(ip: &str, user_agent: Option<&str>) -> String {
    match user_agent {
        Some(ua) if is_mobile(ua) => format!("{ip}-mobile-{}", user_agent_bucket(ua)),
        _ => ip.to_owned(),
    }
}
