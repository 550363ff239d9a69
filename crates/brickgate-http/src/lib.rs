//! Brickgate HTTP: axum transport adapter for the booking admission layer.
//!
//! Provides:
//! - The booking endpoint behind the admission chain
//! - System/health and metrics endpoints
//! - OpenAPI/Swagger UI
//! - Rate limiting, speed limiting, honeypot, booking caps, jitter and
//!   request-ID middleware

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ErrorBody;

pub use state::AppState;

// ---------------------------------------------------------------------------
// OpenAPI
// ---------------------------------------------------------------------------

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Brickgate API",
        description = "Appointment booking API guarded by an admission layer.\n\nBooking requests pass a sliding-window API limiter, a progressive speed limiter, a honeypot check, per-IP and per-phone booking caps, and a randomized response delay.",
        version = "0.3.2",
        license(name = "Apache-2.0"),
    ),
    paths(
        routes::system::health,
        routes::booking::create_booking,
    ),
    components(
        schemas(
            types::BookingRequest, types::BookingResponse, types::HealthResponse, ErrorBody,
            brickgate_service::types::Appointment, brickgate_service::types::AppointmentStatus,
            brickgate_service::types::Attachment,
        )
    ),
    tags(
        (name = "Booking", description = "Appointment booking"),
        (name = "System", description = "System and health endpoints"),
    )
)]
struct ApiDoc;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Builds the HTTP API router.
///
/// Booking requests run, outermost first: API rate limit, speed limit,
/// body decoding, honeypot, booking caps, response jitter.
pub fn router(state: AppState) -> Router {
    let booking = Router::new()
        .route("/booking", post(routes::booking::create_booking))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::timing::response_jitter_middleware,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::booking_limit::booking_limit_middleware,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::honeypot::honeypot_middleware,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::form::booking_form_middleware,
        ))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::speed_limit::speed_limit_middleware,
        ))
        .route_layer(DefaultBodyLimit::max(state.body_limit()));

    let api = booking.layer(from_fn_with_state(
        state.clone(),
        middleware::rate_limit::rate_limit_middleware,
    ));

    let app = Router::new()
        .nest("/api", api)
        .route("/health", get(routes::system::health))
        .route("/metrics", get(routes::system::metrics_endpoint))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state))
        .with_state(state);

    app.merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
}

/// Serve the HTTP router on the given listener with graceful shutdown.
///
/// Wraps `axum::serve` with `ConnectInfo<SocketAddr>` so client keys can
/// fall back to the peer address.
pub async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .expect("server error");
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = state.cors_origins();

    // No origins configured → no CORS headers.
    if origins.is_empty() {
        return CorsLayer::new();
    }

    let x_request_id = axum::http::header::HeaderName::from_static("x-request-id");
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE, x_request_id.clone()])
        .expose_headers([
            x_request_id,
            axum::http::header::RETRY_AFTER,
            axum::http::header::HeaderName::from_static("ratelimit-limit"),
            axum::http::header::HeaderName::from_static("ratelimit-remaining"),
            axum::http::header::HeaderName::from_static("ratelimit-reset"),
        ]);

    if origins.len() == 1 && origins[0] == "*" {
        tracing::warn!("CORS configured with wildcard origin, all cross-origin requests allowed");
        base.allow_origin(tower_http::cors::Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        base.allow_origin(parsed)
    }
}
