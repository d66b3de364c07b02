//! Relays admin requests to the voice server and tracks the one pending request.

use std::fmt;
use std::time::Duration;

use calladmin_query::{QueryError, ServerQuery, TextTarget};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::helpers::{format_elapsed, strip_color_codes};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("query login credentials have not been specified")]
    MissingCredentials,
}

/// Where and how to reach the query interface.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub host: String,
    pub port: u16,
    pub server_id: u32,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl QuerySettings {
    /// Fails when either credential is missing, which disables admin requests.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let (Some(username), Some(password)) = (&config.username, &config.password) else {
            return Err(ConfigError::MissingCredentials);
        };
        Ok(Self {
            host: config.query_ip.clone(),
            port: config.query_port,
            server_id: config.server_id,
            username: username.clone(),
            password: password.clone(),
            timeout: config.query_timeout,
        })
    }
}

/// The admin request currently waiting for an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequest {
    pub requester_id: String,
    pub requester_name: String,
    pub reason: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A request is pending and the cooldown has not elapsed.
    AlreadySent { elapsed: i64 },
    BroadcastFailed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::AlreadySent { elapsed } => {
                write!(f, "already sent {} ago", format_elapsed(*elapsed))
            }
            Rejection::BroadcastFailed => f.write_str("broadcast failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Accepted,
    Rejected(Rejection),
}

impl RequestOutcome {
    /// In-game chat line for the requester.
    pub fn player_message(&self) -> String {
        match self {
            RequestOutcome::Accepted => {
                "^7Admin request ^2sent^7: an admin will connect as soon as possible".to_string()
            }
            RequestOutcome::Rejected(Rejection::AlreadySent { elapsed }) => format!(
                "^7Admin request ^1aborted^7: already sent ^3{} ^7ago",
                format_elapsed(*elapsed)
            ),
            RequestOutcome::Rejected(Rejection::BroadcastFailed) => {
                "^7Admin request ^1failed^7: try again in few minutes".to_string()
            }
        }
    }
}

/// Message the host must deliver to the original requester once an admin arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminArrival {
    pub requester_id: String,
    pub message: String,
}

pub struct AdminRequestBroadcaster {
    settings: QuerySettings,
    hostname: String,
    cooldown_threshold: i64,
    admin_level: u32,
    pending: Mutex<Option<PendingRequest>>,
}

impl AdminRequestBroadcaster {
    pub fn new(
        settings: QuerySettings,
        hostname: &str,
        cooldown_threshold: i64,
        admin_level: u32,
    ) -> Self {
        Self {
            settings,
            hostname: strip_color_codes(hostname),
            cooldown_threshold,
            admin_level,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let settings = QuerySettings::from_config(config)?;
        Ok(Self::new(
            settings,
            &config.hostname,
            config.cooldown_threshold_secs,
            config.admin_level,
        ))
    }

    pub fn admin_level(&self) -> u32 {
        self.admin_level
    }

    pub async fn pending(&self) -> Option<PendingRequest> {
        self.pending.lock().await.clone()
    }

    /// Connect, log in and select the server once, then disconnect.
    pub async fn probe(&self) -> Result<(), QueryError> {
        let query = self.open_session().await?;
        query.disconnect().await;
        Ok(())
    }

    /// Broadcast an admin request unless one was sent within the cooldown.
    pub async fn request_admin(
        &self,
        requester_id: &str,
        requester_name: &str,
        reason: &str,
        now: i64,
    ) -> RequestOutcome {
        let mut pending = self.pending.lock().await;

        if let Some(existing) = pending.as_ref() {
            let elapsed = now.saturating_sub(existing.created_at);
            if elapsed < self.cooldown_threshold {
                debug!(requester = %requester_id, elapsed, "admin request already pending");
                return RequestOutcome::Rejected(Rejection::AlreadySent { elapsed });
            }
        }

        let requester_name = strip_color_codes(requester_name);
        let reason = strip_color_codes(reason);
        let text = format!(
            "[B][ADMIN REQUEST][/B] [B]{}[/B] requested an admin on [B]{}[/B] : [B]{}[/B]",
            requester_name, self.hostname, reason
        );

        match self.broadcast(&text).await {
            Ok(()) => {
                info!(requester = %requester_id, %reason, "admin request sent");
                *pending = Some(PendingRequest {
                    requester_id: requester_id.to_string(),
                    requester_name,
                    reason,
                    created_at: now,
                });
                RequestOutcome::Accepted
            }
            Err(_) => {
                *pending = None;
                RequestOutcome::Rejected(Rejection::BroadcastFailed)
            }
        }
    }

    /// Close the pending request when an admin joins the game server.
    pub async fn on_privileged_user_connect(&self, name: &str, level: u32) -> Option<AdminArrival> {
        if level < self.admin_level {
            return None;
        }

        let mut pending = self.pending.lock().await;
        let request = pending.take()?;

        let name = strip_color_codes(name);
        debug!(admin = %name, level, "admin connected to the server");
        let text = format!(
            "[B][ADMIN REQUEST][/B] [B]{} [{}][/B] connected to [B]{}[/B]",
            name, level, self.hostname
        );
        if let Err(err) = self.broadcast(&text).await {
            warn!(%err, "admin arrival notice not sent");
        }

        Some(AdminArrival {
            requester_id: request.requester_id,
            message: format!("^7[^2ADMIN ONLINE^7] {name} [^3{level}^7]"),
        })
    }

    /// Cancel the pending request when its requester leaves. Returns whether it was cancelled.
    pub async fn on_user_disconnect(&self, user_id: &str) -> bool {
        let mut pending = self.pending.lock().await;
        let Some(request) = pending.take_if(|r| r.requester_id == user_id) else {
            return false;
        };

        debug!(requester = %request.requester_name, "admin request canceled: requester disconnected");
        let text = format!(
            "[B][ADMIN REQUEST][/B] [B]{}[/B] disconnected from [B]{}[/B]",
            request.requester_name, self.hostname
        );
        if let Err(err) = self.broadcast(&text).await {
            warn!(%err, "requester disconnect notice not sent");
        }
        true
    }

    /// Send one message to the whole virtual server over a fresh session.
    async fn broadcast(&self, text: &str) -> Result<(), QueryError> {
        let query = self.open_session().await?;
        debug!(%text, "sending message on the query interface");
        let result = query.send_text_message(TextTarget::Server, 1, text).await;
        query.disconnect().await;

        if let Err(err) = &result {
            log_query_failure(err);
        }
        result
    }

    async fn open_session(&self) -> Result<ServerQuery, QueryError> {
        let query = ServerQuery::new(self.settings.host.clone(), self.settings.port)
            .with_timeout(self.settings.timeout);

        let result = async {
            debug!(addr = %query.addr(), "connecting to query interface");
            query.connect().await?;
            debug!(username = %self.settings.username, "logging in to query interface");
            query
                .login(&self.settings.username, &self.settings.password)
                .await?;
            debug!(server_id = self.settings.server_id, "selecting virtual server");
            query.select_server(self.settings.server_id).await
        }
        .await;

        match result {
            Ok(()) => Ok(query),
            Err(err) => {
                query.disconnect().await;
                log_query_failure(&err);
                Err(err)
            }
        }
    }
}

/// Log a failed query exchange, with a hint when this host is banned.
fn log_query_failure(err: &QueryError) {
    if err.is_ip_banned() {
        warn!(
            "banned from the voice server: add this host's address to the query whitelist \
             (query_ip_whitelist.txt)"
        );
    }
    if err.is_connection_error() {
        error!(%err, "could not reach the query interface");
    } else {
        error!(%err, code = ?err.code(), "query command failed");
    }
}
