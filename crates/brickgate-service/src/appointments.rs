//! In-memory appointment book with per-slot capacity.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::types::{Appointment, AppointmentStatus, Attachment, BookingForm};

/// Maximum files accepted with one booking.
pub const MAX_ATTACHMENTS: usize = 5;

const SLOT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Validated booking input.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service_type: String,
    pub slot: NaiveDateTime,
    pub message: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl NewAppointment {
    /// Validates a submitted form. Reports the first offending field.
    pub fn from_form(form: &BookingForm) -> Result<Self, ServiceError> {
        let required = |name: &str| {
            form.text(name)
                .map(str::to_owned)
                .ok_or_else(|| ServiceError::BadRequest(format!("{name} is required")))
        };
        let optional = |name: &str| form.text(name).map(str::to_owned);

        let name = required("name")?;
        let phone = required("phone")?;
        let service_type = required("serviceType")?;
        let date = required("appointmentDate")?;
        let slot = parse_appointment_date(&date)
            .ok_or_else(|| ServiceError::BadRequest("appointmentDate is not a valid date".into()))?;

        let email = optional("email");
        if let Some(email) = &email
            && !email.contains('@')
        {
            return Err(ServiceError::BadRequest("email is not valid".into()));
        }

        let attachments = form.attachments().to_vec();
        if attachments.len() > MAX_ATTACHMENTS {
            return Err(ServiceError::BadRequest(format!(
                "at most {MAX_ATTACHMENTS} images may be attached"
            )));
        }
        if attachments.iter().any(|a| {
            !a.content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"))
        }) {
            return Err(ServiceError::BadRequest("only image attachments are accepted".into()));
        }

        Ok(Self {
            name,
            phone,
            email,
            address: optional("address"),
            service_type,
            slot,
            message: optional("message"),
            attachments,
        })
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM` or a bare `YYYY-MM-DD` (midnight).
/// Offsets are converted to UTC.
pub fn parse_appointment_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, SLOT_FORMAT) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Stored appointments plus a per-slot booking count.
#[derive(Clone)]
pub struct AppointmentBook {
    inner: Arc<BookInner>,
}

struct BookInner {
    slot_capacity: usize,
    appointments: DashMap<Uuid, Appointment>,
    slots: DashMap<NaiveDateTime, usize>,
}

impl AppointmentBook {
    /// `slot_capacity = 0` means unlimited.
    pub fn new(slot_capacity: usize) -> Self {
        Self {
            inner: Arc::new(BookInner {
                slot_capacity,
                appointments: DashMap::new(),
                slots: DashMap::new(),
            }),
        }
    }

    /// Books a slot if it has room.
    pub fn create(
        &self,
        new: NewAppointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, ServiceError> {
        {
            let mut taken = self.inner.slots.entry(new.slot).or_insert(0);
            let capacity = self.inner.slot_capacity;
            if capacity > 0 && *taken >= capacity {
                return Err(ServiceError::Conflict(
                    "Selected time slot is fully booked.".into(),
                ));
            }
            *taken += 1;
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            name: new.name,
            phone: new.phone,
            email: new.email,
            address: new.address,
            service_type: new.service_type,
            appointment_date: new.slot.format(SLOT_FORMAT).to_string(),
            message: new.message,
            status: AppointmentStatus::Pending,
            attachments: new.attachments,
            created_at: now,
        };
        self.inner
            .appointments
            .insert(appointment.id, appointment.clone());

        tracing::info!(
            id = %appointment.id,
            slot = %appointment.appointment_date,
            service = %appointment.service_type,
            "appointment booked"
        );
        Ok(appointment)
    }

    pub fn get(&self, id: Uuid) -> Option<Appointment> {
        self.inner.appointments.get(&id).map(|a| a.value().clone())
    }

    pub fn booked_in_slot(&self, slot: NaiveDateTime) -> usize {
        self.inner.slots.get(&slot).map_or(0, |n| *n)
    }

    pub fn len(&self) -> usize {
        self.inner.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.appointments.is_empty()
    }
}
