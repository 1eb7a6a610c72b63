//! Socket configuration.
//!
//! Defaults match the game server's expectations: 3 reconnect attempts, 2s
//! between attempts, a heartbeat probe every 10s with 3s to answer.

use std::time::Duration;

use crate::error::ConfigError;
use crate::websocket::shared::{
    default_heartbeat_grace, default_heartbeat_period, default_reconnect_delay,
    DEFAULT_RECONNECT_LIMIT,
};

/// Heartbeat sentinel payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingPong {
    pub ping: String,
    pub pong: String,
}

impl PingPong {
    pub fn new(ping: impl Into<String>, pong: impl Into<String>) -> Self {
        Self {
            ping: ping.into(),
            pong: pong.into(),
        }
    }
}

/// Configuration for one socket controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Connection target
    pub url: String,
    /// Attempts allowed per failure streak before the socket gives up
    pub reconnect_limit: u32,
    /// Fixed wait before each reconnect attempt
    pub reconnect_delay: Duration,
    /// Heartbeat tokens; `None` disables the heartbeat entirely
    pub ping_pong: Option<PingPong>,
    pub heartbeat_period: Duration,
    pub heartbeat_grace: Duration,
}

impl SocketConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_limit: DEFAULT_RECONNECT_LIMIT,
            reconnect_delay: default_reconnect_delay(),
            ping_pong: None,
            heartbeat_period: default_heartbeat_period(),
            heartbeat_grace: default_heartbeat_grace(),
        }
    }

    pub fn with_ping_pong(mut self, ping_pong: PingPong) -> Self {
        self.ping_pong = Some(ping_pong);
        self
    }

    pub fn with_reconnect_limit(mut self, limit: u32) -> Self {
        self.reconnect_limit = limit;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_heartbeat_timing(mut self, period: Duration, grace: Duration) -> Self {
        self.heartbeat_period = period;
        self.heartbeat_grace = grace;
        self
    }

    pub fn heartbeat_enabled(&self) -> bool {
        self.ping_pong.is_some()
    }

    /// Load from `FISHING_WS_*` environment variables.
    ///
    /// `FISHING_WS_URL` is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (same keys as [`SocketConfig::from_env`]).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_url = get("FISHING_WS_URL").ok_or(ConfigError::Missing("FISHING_WS_URL"))?;
        let url = validate_url(&raw_url)?;
        let mut config = Self::new(url);

        config.ping_pong = match (get("FISHING_WS_PING"), get("FISHING_WS_PONG")) {
            (Some(ping), Some(pong)) => Some(PingPong { ping, pong }),
            (None, None) => None,
            _ => return Err(ConfigError::IncompleteHeartbeat),
        };

        if let Some(v) = get("FISHING_WS_RECONNECT_LIMIT") {
            config.reconnect_limit = parse_number("FISHING_WS_RECONNECT_LIMIT", &v)?;
        }
        if let Some(v) = get("FISHING_WS_RECONNECT_DELAY_MS") {
            config.reconnect_delay =
                Duration::from_millis(parse_number("FISHING_WS_RECONNECT_DELAY_MS", &v)?);
        }
        if let Some(v) = get("FISHING_WS_HEARTBEAT_SECS") {
            config.heartbeat_period =
                Duration::from_secs(parse_number("FISHING_WS_HEARTBEAT_SECS", &v)?);
        }
        if let Some(v) = get("FISHING_WS_HEARTBEAT_GRACE_SECS") {
            config.heartbeat_grace =
                Duration::from_secs(parse_number("FISHING_WS_HEARTBEAT_GRACE_SECS", &v)?);
        }

        Ok(config)
    }
}

fn validate_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "ws" | "wss" => Ok(raw.to_string()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}
