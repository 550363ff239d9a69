//! Honeypot fields: decoy inputs hidden from people, filled in by bots.

use crate::types::BookingForm;

/// Field names rendered invisibly in the booking form.
pub const HONEYPOT_FIELDS: [&str; 5] = ["website", "url", "homepage", "bot_field", "spam_check"];

/// Returns `true` if any decoy field carries a non-blank value.
pub fn is_tripped(form: &BookingForm) -> bool {
    HONEYPOT_FIELDS.iter().any(|name| form.text(name).is_some())
}
