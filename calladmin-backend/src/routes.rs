use crate::AppState;
use crate::broadcaster::RequestOutcome;
use crate::error::AppError;
use crate::helpers::{format_elapsed, hash_api_key, now, strip_color_codes};
use crate::roster::OnlinePlayer;
use crate::validation;

use axum::{Json, extract::State, response::IntoResponse};
use axum_extra::TypedHeader;
use axum_macros::debug_handler;
use headers::Authorization;
use headers::authorization::Bearer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type Auth = Option<TypedHeader<Authorization<Bearer>>>;

#[derive(Deserialize)]
pub(crate) struct CallAdminRequest {
    player_id: String,
    player_name: String,
    reason: String,
}

#[derive(Serialize)]
pub(crate) struct CallAdminResponse {
    outcome: &'static str,
    /// Chat line to show the requester
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct JoinRequest {
    player_id: String,
    player_name: String,
    #[serde(default)]
    level: u32,
}

#[derive(Serialize)]
pub(crate) struct Notify {
    player_id: String,
    message: String,
}

#[derive(Serialize)]
pub(crate) struct JoinResponse {
    notify: Option<Notify>,
}

#[derive(Deserialize)]
pub(crate) struct LeaveRequest {
    player_id: String,
}

#[derive(Serialize)]
pub(crate) struct LeaveResponse {
    cancelled: bool,
}

#[derive(Serialize)]
pub(crate) struct AdminInfo {
    name: String,
    level: u32,
}

#[derive(Serialize)]
pub(crate) struct PendingInfo {
    player_id: String,
    player_name: String,
    reason: String,
    created_at: i64,
    elapsed: String,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    enabled: bool,
    admins_online: Vec<AdminInfo>,
    pending: Option<PendingInfo>,
}

/// Check the bearer token when an API key is configured.
fn authorize(state: &AppState, auth: &Auth) -> Result<(), AppError> {
    let Some(expected) = &state.api_key_hash else {
        return Ok(());
    };
    match auth {
        Some(TypedHeader(bearer)) if hash_api_key(bearer.token()) == *expected => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

#[debug_handler]
pub(crate) async fn calladmin(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<CallAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_id(&payload.player_id)?;
    validation::validate_player_name(&payload.player_name)?;
    let reason = validation::validate_reason(&payload.reason)?;

    let broadcaster = state.broadcaster.as_ref().ok_or(AppError::Disabled)?;

    let admins = state.roster.admins(state.admin_level).await;
    if !admins.is_empty() {
        let list = admins
            .iter()
            .map(|a| format!("^7{} ^7[^3{}^7]", a.name, a.level))
            .collect::<Vec<_>>()
            .join(", ");
        let plural = if admins.len() == 1 { "" } else { "s" };
        return Ok(Json(CallAdminResponse {
            outcome: "rejected",
            message: format!("^7Admin{plural} already online: {list}"),
            reason: Some("admins already online".to_string()),
        }));
    }

    let outcome = broadcaster
        .request_admin(&payload.player_id, &payload.player_name, &reason, now())
        .await;

    let message = outcome.player_message();
    let response = match outcome {
        RequestOutcome::Accepted => CallAdminResponse {
            outcome: "accepted",
            message,
            reason: None,
        },
        RequestOutcome::Rejected(rejection) => CallAdminResponse {
            outcome: "rejected",
            message,
            reason: Some(rejection.to_string()),
        },
    };
    Ok(Json(response))
}

#[debug_handler]
pub(crate) async fn player_join(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<JoinRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_id(&payload.player_id)?;
    validation::validate_player_name(&payload.player_name)?;

    state
        .roster
        .join(OnlinePlayer {
            id: payload.player_id,
            name: strip_color_codes(&payload.player_name),
            level: payload.level,
            joined_at: now(),
        })
        .await;

    let notify = match &state.broadcaster {
        Some(broadcaster) => broadcaster
            .on_privileged_user_connect(&payload.player_name, payload.level)
            .await
            .map(|arrival| Notify {
                player_id: arrival.requester_id,
                message: arrival.message,
            }),
        None => None,
    };

    Ok(Json(JoinResponse { notify }))
}

pub(crate) async fn player_leave(
    State(state): State<Arc<AppState>>,
    auth: Auth,
    Json(payload): Json<LeaveRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;
    validation::validate_player_id(&payload.player_id)?;

    state.roster.leave(&payload.player_id).await;

    let cancelled = match &state.broadcaster {
        Some(broadcaster) => broadcaster.on_user_disconnect(&payload.player_id).await,
        None => false,
    };

    Ok(Json(LeaveResponse { cancelled }))
}

pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
    auth: Auth,
) -> Result<impl IntoResponse, AppError> {
    authorize(&state, &auth)?;

    let admins_online = state
        .roster
        .admins(state.admin_level)
        .await
        .into_iter()
        .map(|p| AdminInfo {
            name: p.name,
            level: p.level,
        })
        .collect();

    let pending = match &state.broadcaster {
        Some(broadcaster) => broadcaster.pending().await.map(|p| PendingInfo {
            elapsed: format_elapsed(now() - p.created_at),
            player_id: p.requester_id,
            player_name: p.requester_name,
            reason: p.reason,
            created_at: p.created_at,
        }),
        None => None,
    };

    Ok(Json(StatusResponse {
        enabled: state.broadcaster.is_some(),
        admins_online,
        pending,
    }))
}
