pub mod broadcaster;
pub mod config;
mod error;
pub mod helpers;
pub mod roster;
mod routes;
mod validation;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::broadcaster::AdminRequestBroadcaster;
use crate::roster::Roster;

pub struct AppState {
    /// `None` when admin requests are disabled.
    pub broadcaster: Option<AdminRequestBroadcaster>,
    pub roster: Roster,
    pub admin_level: u32,
    pub api_key_hash: Option<String>,
}

impl AppState {
    pub fn new(
        broadcaster: Option<AdminRequestBroadcaster>,
        admin_level: u32,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            broadcaster,
            roster: Roster::new(),
            admin_level,
            api_key_hash: api_key.map(helpers::hash_api_key),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Seconds to replenish one /calladmin request
    pub calladmin_period_secs: u64,
    /// Burst size for /calladmin
    pub calladmin_burst: u32,
    /// Milliseconds to replenish one player event
    pub events_period_ms: u64,
    /// Burst size for player events
    pub events_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            calladmin_period_secs: 10,
            calladmin_burst: 5,
            events_period_ms: 10,
            events_burst: 200,
        }
    }
}

/// Create the application router with the given state and configuration
pub fn create_app(
    state: AppState,
    request_body_limit: usize,
    request_timeout: Duration,
    rate_limit: RateLimitConfig,
) -> Router {
    let state = Arc::new(state);

    // Players ask for an admin rarely; the broadcaster's cooldown does the rest
    let calladmin_governor = GovernorConfigBuilder::default()
        .per_second(rate_limit.calladmin_period_secs.max(1))
        .burst_size(rate_limit.calladmin_burst.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("calladmin rate limit must be non-zero");

    // Join/leave events arrive in bursts on map changes
    let events_governor = GovernorConfigBuilder::default()
        .per_millisecond(rate_limit.events_period_ms.max(1))
        .burst_size(rate_limit.events_burst.max(1))
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("event rate limit must be non-zero");

    let calladmin_routes = Router::new()
        .route("/calladmin", post(routes::calladmin))
        .layer(GovernorLayer::new(calladmin_governor));

    let event_routes = Router::new()
        .route("/players/join", post(routes::player_join))
        .route("/players/leave", post(routes::player_leave))
        .route("/status", get(routes::status))
        .layer(GovernorLayer::new(events_governor));

    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(calladmin_routes)
        .merge(event_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(RequestBodyLimitLayer::new(request_body_limit))
        .with_state(state)
}
