//! Buffers and decodes booking bodies so admission checks can read fields.
//!
//! Accepts JSON, URL-encoded and multipart bodies. The decoded form is
//! stored in request extensions as [`BookingSubmission`]; the raw bytes
//! are put back so the request stays intact for downstream layers.

use std::sync::Arc;

use axum::body::{Body, Bytes, to_bytes};
use axum::extract::multipart::MultipartError;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::middleware::Next;
use axum::response::Response;
use brickgate_service::types::{Attachment, BookingForm};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

/// Decoded booking form, shared by the admission layers and the handler.
#[derive(Debug, Clone)]
pub struct BookingSubmission(pub Arc<BookingForm>);

pub async fn booking_form_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let bytes = to_bytes(body, state.body_limit())
        .await
        .map_err(|_| ApiError::PayloadTooLarge)?;

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let form = if content_type.starts_with("application/json") {
        decode_json(&bytes)?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        decode_urlencoded(&bytes)?
    } else if content_type.starts_with("multipart/form-data") {
        let mut multipart_req = Request::new(Body::from(bytes.clone()));
        *multipart_req.headers_mut() = parts.headers.clone();
        *multipart_req.extensions_mut() = parts.extensions.clone();
        decode_multipart(multipart_req).await?
    } else if bytes.is_empty() {
        BookingForm::new()
    } else {
        return Err(ApiError::BadRequest("Unsupported content type.".into()));
    };

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(BookingSubmission(Arc::new(form)));
    Ok(next.run(req).await)
}

fn decode_json(bytes: &Bytes) -> Result<BookingForm, ApiError> {
    if bytes.is_empty() {
        return Ok(BookingForm::new());
    }
    let object: serde_json::Map<String, Value> = serde_json::from_slice(bytes)
        .map_err(|_| ApiError::BadRequest("Malformed JSON body.".into()))?;

    let mut form = BookingForm::new();
    for (name, value) in object {
        append_json(&mut form, &name, value);
    }
    Ok(form)
}

/// Scalars become text; array elements become repeated values; anything
/// nested deeper is kept as its JSON text so it still counts as filled.
fn append_json(form: &mut BookingForm, name: &str, value: Value) {
    match value {
        Value::Null => {}
        Value::String(s) => form.append(name, s),
        Value::Number(n) => form.append(name, n.to_string()),
        Value::Bool(b) => form.append(name, b.to_string()),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) | Value::Object(_) => form.append(name, item.to_string()),
                    scalar => append_json(form, name, scalar),
                }
            }
        }
        Value::Object(_) => form.append(name, value.to_string()),
    }
}

fn decode_urlencoded(bytes: &Bytes) -> Result<BookingForm, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes)
        .map_err(|_| ApiError::BadRequest("Malformed form body.".into()))?;
    Ok(pairs.into_iter().collect())
}

async fn decode_multipart(req: Request) -> Result<BookingForm, ApiError> {
    let malformed = |_: MultipartError| ApiError::BadRequest("Malformed multipart body.".into());
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|_| ApiError::BadRequest("Malformed multipart body.".into()))?;

    let mut form = BookingForm::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_owned();
        if let Some(filename) = field.file_name().map(str::to_owned) {
            let content_type = field.content_type().map(str::to_owned);
            let data = field.bytes().await.map_err(malformed)?;
            form.push_attachment(Attachment {
                field: name,
                filename: Some(filename),
                content_type,
                size: data.len(),
            });
        } else {
            let text = field.text().await.map_err(malformed)?;
            form.append(name, text);
        }
    }
    Ok(form)
}
