//! HTTP middleware: the booking admission chain and request ID tracking.
//!
//! Booking requests pass, in order: `rate_limit` → `speed_limit` →
//! `form` → `honeypot` → `booking_limit` → `timing` → handler.

pub mod booking_limit;
pub mod client;
pub mod form;
pub mod honeypot;
pub mod rate_limit;
pub mod request_id;
pub mod speed_limit;
pub mod timing;
