//! Booking creation endpoint.

use axum::extract::{Extension, Json, State};
use axum::http::StatusCode;
use brickgate_service::appointments::NewAppointment;
use chrono::Utc;

use crate::error::{ApiError, ErrorBody};
use crate::middleware::form::BookingSubmission;
use crate::state::AppState;
use crate::types::{BookingRequest, BookingResponse};

/// Book an appointment.
///
/// Runs behind the full admission chain: API rate limit, speed limit,
/// honeypot check, per-IP and per-phone booking caps, and response jitter.
#[utoipa::path(
    post,
    path = "/api/booking",
    request_body(content = BookingRequest, description = "Booking details"),
    responses(
        (status = 201, description = "Appointment booked", body = BookingResponse),
        (status = 400, description = "Invalid or suspicious submission", body = ErrorBody),
        (status = 409, description = "Slot fully booked", body = ErrorBody),
        (status = 413, description = "Body too large", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody),
    ),
    tag = "Booking"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    submission: Option<Extension<BookingSubmission>>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let Some(Extension(BookingSubmission(form))) = submission else {
        return Err(ApiError::Internal(
            "booking handler reached without a decoded submission".into(),
        ));
    };
    let new = NewAppointment::from_form(&form)?;
    let appointment = state.appointments().create(new, Utc::now())?;
    state.metrics().record_booking();

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            success: true,
            message: "Appointment booked successfully. We will contact you shortly.".to_owned(),
            data: appointment,
        }),
    ))
}
