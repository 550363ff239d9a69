//! Transport-agnostic types shared across the service layer.
//!
//! Transports decode request bodies into `BookingForm`; everything after
//! that (honeypot, phone limiter, booking handler) reads from it.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Flattened booking submission: text fields plus attachment metadata.
///
/// A field submitted more than once keeps every value, so a later blank
/// value never hides an earlier filled one.
#[derive(Debug, Clone, Default)]
pub struct BookingForm {
    fields: HashMap<String, Vec<String>>,
    attachments: Vec<Attachment>,
}

impl BookingForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a text field, replacing any values already submitted under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), vec![value.into()]);
    }

    /// Adds one more value under `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    pub fn push_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Raw first value of a field, if submitted.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values(name).next()
    }

    /// Every raw value submitted under `name`, in order.
    pub fn values(&self, name: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(name)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// First non-blank value of a field, trimmed.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values(name).map(str::trim).find(|v| !v.is_empty())
    }

    pub fn phone(&self) -> Option<&str> {
        self.text("phone")
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BookingForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::new();
        for (k, v) in iter {
            form.append(k, v);
        }
        form
    }
}

/// Uploaded file metadata. Contents are not retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Form field the file was submitted under.
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Size in bytes.
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Awaiting confirmation by staff.
    Pending,
}

/// A stored booking.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service_type: String,
    /// Normalized slot, `YYYY-MM-DDTHH:MM` (UTC).
    pub appointment_date: String,
    pub message: Option<String>,
    pub status: AppointmentStatus,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}
