mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use calladmin_backend::broadcaster::AdminRequestBroadcaster;
use calladmin_backend::config::Config;
use calladmin_backend::{AppState, RateLimitConfig, create_app};
use common::{FakeQueryServer, unreachable_settings};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
// for `oneshot` method

const ADMIN_LEVEL: u32 = 20;

/// Helper to create app with default test configuration
fn create_test_app(state: AppState) -> axum::Router {
    let config = Config::default();
    create_app(
        state,
        config.request_body_limit,
        config.request_timeout,
        RateLimitConfig::default(),
    )
}

/// App backed by a fake query interface
async fn setup_enabled() -> (FakeQueryServer, AppState) {
    let server = FakeQueryServer::start().await;
    let broadcaster = server.broadcaster(3600, ADMIN_LEVEL);
    let state = AppState::new(Some(broadcaster), ADMIN_LEVEL, None);
    (server, state)
}

/// Helper to send a request and get response
async fn send_request(
    app: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    auth_token: Option<&str>,
) -> (StatusCode, Value) {
    // The rate limiter keys on the client address
    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header("X-Forwarded-For", "127.0.0.1");

    if let Some(token) = auth_token {
        request_builder = request_builder.header("Authorization", format!("Bearer {}", token));
    }

    let request = if let Some(json_body) = body {
        request_builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json_body).unwrap()))
            .unwrap()
    } else {
        request_builder.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    let json = if body_bytes.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(json!({}))
    };

    (status, json)
}

fn calladmin_body(id: &str, name: &str, reason: &str) -> Value {
    json!({ "player_id": id, "player_name": name, "reason": reason })
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let app = create_test_app(AppState::new(None, ADMIN_LEVEL, None));

    let (status, _body) = send_request(&app, "GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// CALLADMIN ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_calladmin_accepted() {
    // GIVEN: An enabled broadcaster and no admins online
    let (server, state) = setup_enabled().await;
    let app = create_test_app(state);

    // WHEN: A player calls for an admin
    let (status, body) = send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "^1cheater")),
        None,
    )
    .await;

    // THEN: The request is accepted and relayed
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "accepted");
    assert_eq!(
        body["message"],
        "^7Admin request ^2sent^7: an admin will connect as soon as possible"
    );
    assert!(body.get("reason").is_none());
    assert_eq!(server.messages().len(), 1);
    assert!(server.messages()[0].ends_with("[B]cheater[/B]"));
}

#[tokio::test]
async fn test_calladmin_second_request_rejected() {
    // GIVEN: A request already sent
    let (server, state) = setup_enabled().await;
    let app = create_test_app(state);
    send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "cheater")),
        None,
    )
    .await;

    // WHEN: Another player calls for an admin right after
    let (status, body) = send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("7", "Bill", "spawn killing")),
        None,
    )
    .await;

    // THEN: It is rejected with the elapsed time
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "rejected");
    assert!(body["reason"].as_str().unwrap().starts_with("already sent"));
    assert!(body["message"].as_str().unwrap().contains("^1aborted"));
    assert_eq!(server.messages().len(), 1);
}

#[tokio::test]
async fn test_calladmin_with_admin_online() {
    // GIVEN: An admin already in game
    let (server, state) = setup_enabled().await;
    let app = create_test_app(state);
    send_request(
        &app,
        "POST",
        "/players/join",
        Some(json!({ "player_id": "1", "player_name": "Bill", "level": 100 })),
        None,
    )
    .await;

    // WHEN: A player calls for an admin
    let (status, body) = send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "cheater")),
        None,
    )
    .await;

    // THEN: The player is pointed at the online admin instead
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["reason"], "admins already online");
    assert_eq!(body["message"], "^7Admin already online: ^7Bill ^7[^3100^7]");
    assert!(server.messages().is_empty());
}

#[tokio::test]
async fn test_calladmin_missing_reason() {
    let (_server, state) = setup_enabled().await;
    let app = create_test_app(state);

    let (status, body) = send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "  ")),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Missing data"));
}

#[tokio::test]
async fn test_calladmin_disabled_without_credentials() {
    // GIVEN: No query credentials configured
    let broadcaster = AdminRequestBroadcaster::from_config(&Config::default()).ok();
    assert!(broadcaster.is_none());
    let app = create_test_app(AppState::new(broadcaster, ADMIN_LEVEL, None));

    // WHEN: A player calls for an admin
    let (status, body) = send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "cheater")),
        None,
    )
    .await;

    // THEN: The service reports the capability as unavailable
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Admin requests are disabled");
}

#[tokio::test]
async fn test_calladmin_broadcast_failure() {
    let broadcaster =
        AdminRequestBroadcaster::new(unreachable_settings().await, "Server", 3600, ADMIN_LEVEL);
    let app = create_test_app(AppState::new(Some(broadcaster), ADMIN_LEVEL, None));

    let (status, body) = send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "cheater")),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["reason"], "broadcast failed");
}

// =============================================================================
// PLAYER EVENT TESTS
// =============================================================================

#[tokio::test]
async fn test_admin_join_notifies_requester() {
    // GIVEN: A pending request from player 42
    let (server, state) = setup_enabled().await;
    let app = create_test_app(state);
    send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "cheater")),
        None,
    )
    .await;

    // WHEN: A regular player joins
    let (status, body) = send_request(
        &app,
        "POST",
        "/players/join",
        Some(json!({ "player_id": "9", "player_name": "Guest" })),
        None,
    )
    .await;

    // THEN: Nobody is notified
    assert_eq!(status, StatusCode::OK);
    assert!(body["notify"].is_null());

    // WHEN: An admin joins
    let (status, body) = send_request(
        &app,
        "POST",
        "/players/join",
        Some(json!({ "player_id": "1", "player_name": "Bill", "level": 20 })),
        None,
    )
    .await;

    // THEN: The requester gets a direct message and the request is closed
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notify"]["player_id"], "42");
    assert_eq!(body["notify"]["message"], "^7[^2ADMIN ONLINE^7] Bill [^320^7]");
    assert_eq!(server.messages().len(), 2);

    let (_, body) = send_request(&app, "GET", "/status", None, None).await;
    assert!(body["pending"].is_null());
    assert_eq!(body["admins_online"][0]["name"], "Bill");
}

#[tokio::test]
async fn test_requester_leave_cancels() {
    // GIVEN: A pending request from player 42
    let (server, state) = setup_enabled().await;
    let app = create_test_app(state);
    send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "Fenix", "cheater")),
        None,
    )
    .await;

    // WHEN: Another player leaves
    let (_, body) = send_request(
        &app,
        "POST",
        "/players/leave",
        Some(json!({ "player_id": "7" })),
        None,
    )
    .await;
    assert_eq!(body["cancelled"], false);

    // WHEN: The requester leaves
    let (status, body) = send_request(
        &app,
        "POST",
        "/players/leave",
        Some(json!({ "player_id": "42" })),
        None,
    )
    .await;

    // THEN: The request is cancelled
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert_eq!(server.messages().len(), 2);
}

// =============================================================================
// STATUS ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_status_shows_pending_request() {
    let (_server, state) = setup_enabled().await;
    let app = create_test_app(state);
    send_request(
        &app,
        "POST",
        "/calladmin",
        Some(calladmin_body("42", "^2Fenix", "cheater")),
        None,
    )
    .await;

    let (status, body) = send_request(&app, "GET", "/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], true);
    assert_eq!(body["pending"]["player_id"], "42");
    assert_eq!(body["pending"]["player_name"], "Fenix");
    assert_eq!(body["pending"]["reason"], "cheater");
    assert!(body["pending"]["elapsed"].is_string());
    assert_eq!(body["admins_online"], json!([]));
}

#[tokio::test]
async fn test_status_when_disabled() {
    let app = create_test_app(AppState::new(None, ADMIN_LEVEL, None));

    let (status, body) = send_request(&app, "GET", "/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);
    assert!(body["pending"].is_null());
}

// =============================================================================
// AUTHENTICATION TESTS
// =============================================================================

#[tokio::test]
async fn test_api_key_required_when_configured() {
    let app = create_test_app(AppState::new(None, ADMIN_LEVEL, Some("s3cret")));

    let (status, body) = send_request(&app, "GET", "/status", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or missing API key");

    let (status, _) = send_request(&app, "GET", "/status", None, Some("wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send_request(&app, "GET", "/status", None, Some("s3cret")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enabled"], false);

    // Health stays open for probes
    let (status, _) = send_request(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_key_checked_on_player_events() {
    let app = create_test_app(AppState::new(None, ADMIN_LEVEL, Some("s3cret")));

    let (status, _) = send_request(
        &app,
        "POST",
        "/players/join",
        Some(json!({ "player_id": "1", "player_name": "Bill", "level": 100 })),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
