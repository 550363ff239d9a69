//! Request and response bodies for the HTTP API.

use brickgate_service::types::Appointment;
use serde::Serialize;
use utoipa::ToSchema;

/// Booking submission. Also accepted as URL-encoded or multipart form
/// data, where image files may be attached under any field name.
#[derive(Debug, ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct BookingRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    /// Requested service, e.g. `"renovation"`.
    pub service_type: String,
    /// RFC 3339, `YYYY-MM-DDTHH:MM` or `YYYY-MM-DD`.
    pub appointment_date: String,
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
    pub data: Appointment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Keys held across all rate-limit stores.
    pub tracked_keys: usize,
}
