//! Integration tests for the Brickgate HTTP API.
//!
//! Each test starts an in-memory server on an ephemeral port and uses reqwest
//! to exercise the admission chain end to end.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use brickgate_server::{AppState, ServiceConfig};
use brickgate_service::rate_limit::WindowPolicy;
use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// Boots a server with the given limits on an OS-assigned port.
/// Returns the base URL (e.g. "http://127.0.0.1:12345").
async fn spawn_with(config: ServiceConfig) -> String {
    let state = AppState::with_config(&config);
    let app = brickgate_server::router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(brickgate_server::serve(listener, app, std::future::pending()));

    format!("http://{addr}")
}

/// Default limits with delays off and unlimited slots.
fn quiet_config() -> ServiceConfig {
    ServiceConfig {
        slot_capacity: 0,
        ..ServiceConfig::without_delays()
    }
}

async fn spawn_server() -> String {
    spawn_with(quiet_config()).await
}

fn booking(phone: &str, date: &str) -> Value {
    json!({
        "name": "Sita Sharma",
        "phone": phone,
        "email": "sita@example.com",
        "serviceType": "renovation",
        "appointmentDate": date,
        "message": "Kitchen remodel",
    })
}

async fn post_booking(client: &Client, base: &str, ip: &str, body: &Value) -> reqwest::Response {
    client
        .post(format!("{base}/api/booking"))
        .header("x-forwarded-for", ip)
        .json(body)
        .send()
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_ok() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
    assert_eq!(body["tracked_keys"], 0);
}

#[tokio::test]
async fn request_id_generated_when_absent() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client.get(format!("{base}/health")).send().await.unwrap();
    let request_id = resp
        .headers()
        .get("x-request-id")
        .expect("missing x-request-id");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn request_id_preserved_when_provided() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/health"))
        .header("x-request-id", "booking-trace-7")
        .send()
        .await
        .unwrap();
    assert_eq!(
        resp.headers().get("x-request-id").unwrap().to_str().unwrap(),
        "booking-trace-7"
    );
}

#[tokio::test]
async fn openapi_spec_lists_booking() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/api/openapi.json"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["paths"]["/api/booking"]["post"].is_object());
}

// ---------------------------------------------------------------------------
// Booking
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_booking_is_created() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = post_booking(
        &client,
        &base,
        "203.0.113.10",
        &booking("9800000001", "2030-05-01T10:00"),
    )
    .await;
    assert_eq!(resp.status(), 201);
    assert_eq!(resp.headers().get("ratelimit-limit").unwrap(), "1000");
    assert_eq!(resp.headers().get("ratelimit-remaining").unwrap(), "999");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Sita Sharma");
    assert_eq!(body["data"]["serviceType"], "renovation");
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["id"].is_string());
    assert!(body["data"]["createdAt"].is_string());
}

#[tokio::test]
async fn urlencoded_booking_is_created() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/api/booking"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=Hari&phone=9800000002&serviceType=plumbing&appointmentDate=2030-05-02")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["serviceType"], "plumbing");
}

#[tokio::test]
async fn multipart_booking_keeps_image_metadata() {
    let base = spawn_server().await;
    let client = Client::new();

    let form = Form::new()
        .text("name", "Gita")
        .text("phone", "9800000003")
        .text("serviceType", "roofing")
        .text("appointmentDate", "2030-05-03T09:30")
        .part(
            "images",
            Part::bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
                .file_name("roof.jpg")
                .mime_str("image/jpeg")
                .unwrap(),
        );

    let resp = client
        .post(format!("{base}/api/booking"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: Value = resp.json().await.unwrap();
    let attachments = body["data"]["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["filename"], "roof.jpg");
    assert_eq!(attachments[0]["contentType"], "image/jpeg");
    assert_eq!(attachments[0]["size"], 4);
}

#[tokio::test]
async fn non_image_attachment_is_rejected() {
    let base = spawn_server().await;
    let client = Client::new();

    let form = Form::new()
        .text("name", "Gita")
        .text("phone", "9800000004")
        .text("serviceType", "roofing")
        .text("appointmentDate", "2030-05-03")
        .part(
            "images",
            Part::bytes(b"MZ".to_vec())
                .file_name("setup.exe")
                .mime_str("application/octet-stream")
                .unwrap(),
        );

    let resp = client
        .post(format!("{base}/api/booking"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn missing_field_is_named() {
    let base = spawn_server().await;
    let client = Client::new();

    let resp = post_booking(
        &client,
        &base,
        "203.0.113.11",
        &json!({"name": "Ram", "phone": "9800000005", "appointmentDate": "2030-05-04"}),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "serviceType is required");
}

#[tokio::test]
async fn full_slot_returns_conflict() {
    let base = spawn_with(ServiceConfig {
        slot_capacity: 1,
        ..ServiceConfig::without_delays()
    })
    .await;
    let client = Client::new();

    let first = post_booking(
        &client,
        &base,
        "203.0.113.12",
        &booking("9800000006", "2030-06-01T11:00"),
    )
    .await;
    assert_eq!(first.status(), 201);

    let second = post_booking(
        &client,
        &base,
        "203.0.113.13",
        &booking("9800000007", "2030-06-01T11:00"),
    )
    .await;
    assert_eq!(second.status(), 409);
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["message"], "Selected time slot is fully booked.");
}

// ---------------------------------------------------------------------------
// Honeypot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn honeypot_json_is_rejected() {
    let base = spawn_server().await;
    let client = Client::new();

    let mut body = booking("9800000008", "2030-05-05");
    body["bot_field"] = json!("gotcha");

    let resp = post_booking(&client, &base, "203.0.113.14", &body).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": false, "message": "Invalid request detected."})
    );
}

#[tokio::test]
async fn honeypot_multipart_is_rejected() {
    let base = spawn_server().await;
    let client = Client::new();

    let form = Form::new()
        .text("name", "Bot")
        .text("phone", "9800000009")
        .text("serviceType", "roofing")
        .text("appointmentDate", "2030-05-06")
        .text("website", "http://spam.example");

    let resp = client
        .post(format!("{base}/api/booking"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid request detected.");
}

#[tokio::test]
async fn empty_honeypot_field_passes() {
    let base = spawn_server().await;
    let client = Client::new();

    let mut body = booking("9800000010", "2030-05-07");
    body["website"] = json!("");

    let resp = post_booking(&client, &base, "203.0.113.15", &body).await;
    assert_eq!(resp.status(), 201);
}

// ---------------------------------------------------------------------------
// Booking limiter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn booking_ip_cap_blocks_the_101st_attempt() {
    let base = spawn_server().await;
    let client = Client::new();

    for i in 0..100 {
        let resp = post_booking(
            &client,
            &base,
            "1.2.3.4",
            &booking(&format!("98100{i:05}"), "2030-07-01T10:00"),
        )
        .await;
        assert_eq!(resp.status(), 201, "attempt {}", i + 1);
    }

    let before = Utc::now();
    let resp = post_booking(
        &client,
        &base,
        "1.2.3.4",
        &booking("9819999999", "2030-07-01T10:00"),
    )
    .await;
    assert_eq!(resp.status(), 429);
    assert!(resp.headers().get("retry-after").is_some());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["message"],
        "Too many booking attempts from this IP. Please try again later."
    );
    let retry_at: DateTime<Utc> = body["retryAfter"].as_str().unwrap().parse().unwrap();
    let ahead = retry_at - before;
    assert!(ahead > chrono::Duration::minutes(59));
    assert!(ahead <= chrono::Duration::minutes(60));

    // Another IP is unaffected.
    let other = post_booking(
        &client,
        &base,
        "5.6.7.8",
        &booking("9819999998", "2030-07-01T10:00"),
    )
    .await;
    assert_eq!(other.status(), 201);
}

#[tokio::test]
async fn booking_phone_cap_spans_ips() {
    let base = spawn_server().await;
    let client = Client::new();

    for i in 0..50 {
        let resp = post_booking(
            &client,
            &base,
            &format!("10.1.0.{i}"),
            &booking("9800000001", "2030-08-01"),
        )
        .await;
        assert_eq!(resp.status(), 201, "attempt {}", i + 1);
    }

    let resp = post_booking(
        &client,
        &base,
        "10.1.0.200",
        &booking("9800000001", "2030-08-01"),
    )
    .await;
    assert_eq!(resp.status(), 429);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Too many booking attempts for this phone number. Please try again later."
    );
    let retry_at: DateTime<Utc> = body["retryAfter"].as_str().unwrap().parse().unwrap();
    assert!(retry_at - Utc::now() > chrono::Duration::hours(23));
}

#[tokio::test]
async fn booking_limiter_counts_failed_attempts() {
    let base = spawn_with(ServiceConfig {
        booking_ip: WindowPolicy::new(2, Duration::from_secs(3600)),
        ..quiet_config()
    })
    .await;
    let client = Client::new();

    for _ in 0..2 {
        let resp = post_booking(
            &client,
            &base,
            "192.0.2.1",
            &json!({"name": "Ram", "phone": "9800000011"}),
        )
        .await;
        assert_eq!(resp.status(), 400);
    }

    let resp = post_booking(
        &client,
        &base,
        "192.0.2.1",
        &booking("9800000011", "2030-09-01"),
    )
    .await;
    assert_eq!(resp.status(), 429);
}

// ---------------------------------------------------------------------------
// API limiter and speed limiter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn api_limit_returns_window_label_and_headers() {
    let base = spawn_with(ServiceConfig {
        api_rate_limit: 3,
        ..quiet_config()
    })
    .await;
    let client = Client::new();

    for i in 0..3 {
        let resp = post_booking(
            &client,
            &base,
            "198.51.100.1",
            &booking(&format!("982000000{i}"), "2030-10-01"),
        )
        .await;
        assert_eq!(resp.status(), 201);
    }

    let resp = post_booking(
        &client,
        &base,
        "198.51.100.1",
        &booking("9820000009", "2030-10-01"),
    )
    .await;
    assert_eq!(resp.status(), 429);
    assert_eq!(resp.headers().get("ratelimit-limit").unwrap(), "3");
    assert_eq!(resp.headers().get("ratelimit-remaining").unwrap(), "0");
    assert!(resp.headers().get("ratelimit-reset").is_some());
    assert!(resp.headers().get("retry-after").is_some());

    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "success": false,
            "message": "Too many requests from this IP, please try again later.",
            "retryAfter": "15 minutes",
        })
    );

    // Health sits outside the limiter.
    let health = client
        .get(format!("{base}/health"))
        .header("x-forwarded-for", "198.51.100.1")
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
}

#[tokio::test]
async fn mobile_user_agents_get_separate_buckets() {
    let base = spawn_with(ServiceConfig {
        api_rate_limit: 1,
        ..quiet_config()
    })
    .await;
    let client = Client::new();

    let send = |ua: &'static str, phone: &'static str| {
        client
            .post(format!("{base}/api/booking"))
            .header("x-forwarded-for", "100.64.0.1")
            .header("user-agent", ua)
            .json(&booking(phone, "2030-11-01"))
            .send()
    };

    let first = send("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0) Mobile", "9830000001")
        .await
        .unwrap();
    assert_eq!(first.status(), 201);
    let second = send("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile", "9830000002")
        .await
        .unwrap();
    assert_eq!(second.status(), 201);
    let repeat = send("Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile", "9830000003")
        .await
        .unwrap();
    assert_eq!(repeat.status(), 429);
}

#[tokio::test]
async fn speed_limiter_delays_without_rejecting() {
    let base = spawn_with(ServiceConfig {
        slow_after: 1,
        slow_step: Duration::from_millis(300),
        slow_max: Duration::from_millis(1000),
        ..quiet_config()
    })
    .await;
    let client = Client::new();

    let start = Instant::now();
    let first = post_booking(
        &client,
        &base,
        "198.51.100.2",
        &booking("9840000001", "2030-12-01"),
    )
    .await;
    assert_eq!(first.status(), 201);
    let fast = start.elapsed();

    let start = Instant::now();
    let second = post_booking(
        &client,
        &base,
        "198.51.100.2",
        &booking("9840000002", "2030-12-01"),
    )
    .await;
    assert_eq!(second.status(), 201);
    let slowed = start.elapsed();

    assert!(slowed >= Duration::from_millis(300));
    assert!(slowed > fast);
}

#[tokio::test]
async fn response_jitter_delays_admitted_requests() {
    let base = spawn_with(ServiceConfig {
        jitter_min: Duration::from_millis(100),
        jitter_max: Duration::from_millis(150),
        ..quiet_config()
    })
    .await;
    let client = Client::new();

    let start = Instant::now();
    let resp = post_booking(
        &client,
        &base,
        "198.51.100.3",
        &booking("9850000001", "2030-12-02"),
    )
    .await;
    assert_eq!(resp.status(), 201);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metrics_report_admissions_and_rejections() {
    let base = spawn_server().await;
    let client = Client::new();

    post_booking(
        &client,
        &base,
        "203.0.113.20",
        &booking("9860000001", "2031-01-01"),
    )
    .await;
    let mut trap = booking("9860000002", "2031-01-01");
    trap["spam_check"] = json!("x");
    post_booking(&client, &base, "203.0.113.21", &trap).await;

    let resp = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.contains("brickgate_requests_admitted_total 2"));
    assert!(text.contains("brickgate_bookings_created_total 1"));
    assert!(text.contains("brickgate_requests_rejected_total{reason=\"honeypot\"} 1"));
}
