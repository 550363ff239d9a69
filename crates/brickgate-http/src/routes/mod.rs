//! HTTP route handlers.

pub mod booking;
pub mod system;
