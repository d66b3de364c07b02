use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;

/// Application configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Query interface address
    /// Env: TS3_IP (default: "127.0.0.1")
    pub query_ip: String,

    /// Query interface port
    /// Env: TS3_PORT (default: 10011)
    pub query_port: u16,

    /// Virtual server to select after login
    /// Env: TS3_SERVER_ID (default: 1)
    pub server_id: u32,

    /// Query login name
    /// Env: TS3_USERNAME (required for admin requests)
    pub username: Option<String>,

    /// Query login password
    /// Env: TS3_PASSWORD (required for admin requests)
    pub password: Option<String>,

    /// Connect and read timeout for the query interface
    /// Env: QUERY_TIMEOUT_SECS (default: 5)
    pub query_timeout: Duration,

    /// Seconds before a new admin request may replace a pending one
    /// Env: COOLDOWN_THRESHOLD_SECS (default: 3600)
    pub cooldown_threshold_secs: i64,

    /// Minimum player level that counts as an admin
    /// Env: ADMIN_LEVEL (default: 20)
    pub admin_level: u32,

    /// Game server name shown in messages, color codes are stripped
    /// Env: SERVER_HOSTNAME (default: "")
    pub hostname: String,

    /// HTTP port
    /// Env: PORT (default: 3000)
    pub port: u16,

    /// Shared secret the game server plugin sends as a bearer token
    /// Env: API_KEY (optional, no auth when unset)
    pub api_key: Option<String>,

    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536)
    pub request_body_limit: usize,

    /// Request timeout in seconds
    /// Env: REQUEST_TIMEOUT_SECS (default: 60)
    /// Covers a full connect, login, use and send sequence
    pub request_timeout: Duration,

    /// Seconds to replenish one /calladmin request
    /// Env: RATE_LIMIT_CALLADMIN_PERIOD_SECS (default: 10)
    pub rate_limit_calladmin_period_secs: u64,

    /// Burst size for /calladmin
    /// Env: RATE_LIMIT_CALLADMIN_BURST (default: 5)
    pub rate_limit_calladmin_burst: u32,

    /// Milliseconds to replenish one player event (/players/join, /players/leave)
    /// Env: RATE_LIMIT_EVENTS_PERIOD_MS (default: 10)
    pub rate_limit_events_period_ms: u64,

    /// Burst size for player events
    /// Env: RATE_LIMIT_EVENTS_BURST (default: 200)
    pub rate_limit_events_burst: u32,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv();
        Self {
            query_ip: env_or_default_string("TS3_IP", "127.0.0.1"),
            query_port: env_or_default("TS3_PORT", calladmin_query::DEFAULT_PORT),
            server_id: env_or_default("TS3_SERVER_ID", 1),
            username: env_non_empty("TS3_USERNAME"),
            password: env_non_empty("TS3_PASSWORD"),
            query_timeout: Duration::from_secs(env_or_default("QUERY_TIMEOUT_SECS", 5)),
            cooldown_threshold_secs: env_or_default("COOLDOWN_THRESHOLD_SECS", 3600),
            admin_level: env_or_default("ADMIN_LEVEL", 20),
            hostname: env_or_default_string("SERVER_HOSTNAME", ""),
            port: env_or_default("PORT", 3000),
            api_key: env_non_empty("API_KEY"),
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", 64 * 1024),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 60)),
            rate_limit_calladmin_period_secs: env_or_default("RATE_LIMIT_CALLADMIN_PERIOD_SECS", 10),
            rate_limit_calladmin_burst: env_or_default("RATE_LIMIT_CALLADMIN_BURST", 5),
            rate_limit_events_period_ms: env_or_default("RATE_LIMIT_EVENTS_PERIOD_MS", 10),
            rate_limit_events_burst: env_or_default("RATE_LIMIT_EVENTS_BURST", 200),
        }
    }

    pub fn rate_limit(&self) -> crate::RateLimitConfig {
        crate::RateLimitConfig {
            calladmin_period_secs: self.rate_limit_calladmin_period_secs,
            calladmin_burst: self.rate_limit_calladmin_burst,
            events_period_ms: self.rate_limit_events_period_ms,
            events_burst: self.rate_limit_events_burst,
        }
    }
}

impl Default for Config {
    /// Configuration with all default values and no credentials
    fn default() -> Self {
        Self {
            query_ip: "127.0.0.1".to_string(),
            query_port: calladmin_query::DEFAULT_PORT,
            server_id: 1,
            username: None,
            password: None,
            query_timeout: calladmin_query::DEFAULT_TIMEOUT,
            cooldown_threshold_secs: 3600,
            admin_level: 20,
            hostname: String::new(),
            port: 3000,
            api_key: None,
            request_body_limit: 64 * 1024,
            request_timeout: Duration::from_secs(60),
            rate_limit_calladmin_period_secs: 10,
            rate_limit_calladmin_burst: 5,
            rate_limit_events_period_ms: 10,
            rate_limit_events_burst: 200,
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

/// Environment variable, treating an empty value as unset
fn env_non_empty(key: &str) -> Option<String> {
    var(key).ok().filter(|val| !val.is_empty())
}
