//! Chat client configuration parsed from environment variables.
//!
//! Defaults mirror the dashboard's chat widget: a local backend on port 8000,
//! the `general` room, a 20 second connect timeout, and reconnect delays that
//! double from one second up to ten.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";
pub const DEFAULT_WS_PATH: &str = "/ws";
pub const DEFAULT_ROOM: &str = "general";
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_RECONNECT_MIN_MS: u64 = 1_000;
pub const DEFAULT_RECONNECT_MAX_MS: u64 = 10_000;

/// Exponential reconnect delay bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl ReconnectPolicy {
    /// Delay to wait after `current`, doubling up to `max`.
    #[must_use]
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// HTTP(S) or WS(S) base URL of the chat backend.
    pub endpoint: String,
    /// Socket path appended to `endpoint`.
    pub ws_path: String,
    /// Room joined when the user does not pick one.
    pub room: String,
    /// Bound on both the TCP/WS handshake and the `connect` frame.
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    /// Re-issue the last join automatically after a reconnect.
    pub auto_rejoin: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            ws_path: DEFAULT_WS_PATH.to_owned(),
            room: DEFAULT_ROOM.to_owned(),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            reconnect: ReconnectPolicy {
                min: Duration::from_millis(DEFAULT_RECONNECT_MIN_MS),
                max: Duration::from_millis(DEFAULT_RECONNECT_MAX_MS),
            },
            auto_rejoin: false,
        }
    }
}

impl ChatConfig {
    /// Build typed config from process environment variables.
    ///
    /// Optional:
    /// - `CHAT_ENDPOINT`: default `http://localhost:8000`
    /// - `CHAT_WS_PATH`: default `/ws`
    /// - `CHAT_ROOM`: default `general`
    /// - `CHAT_CONNECT_TIMEOUT_MS`: default 20000
    /// - `CHAT_RECONNECT_MIN_MS` / `CHAT_RECONNECT_MAX_MS`: default 1000 / 10000
    /// - `CHAT_AUTO_REJOIN`: default false
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for unparseable values or a config that fails
    /// [`ChatConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ChatConfig::from_env`] but reads values through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`ChatConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            endpoint: get("CHAT_ENDPOINT")
                .map_or(defaults.endpoint, |value| value.trim().trim_end_matches('/').to_owned()),
            ws_path: get("CHAT_WS_PATH").unwrap_or(defaults.ws_path),
            room: get("CHAT_ROOM").map_or(defaults.room, |value| value.trim().to_owned()),
            connect_timeout: Duration::from_millis(parse_u64(
                "CHAT_CONNECT_TIMEOUT_MS",
                get("CHAT_CONNECT_TIMEOUT_MS"),
                DEFAULT_CONNECT_TIMEOUT_MS,
            )?),
            reconnect: ReconnectPolicy {
                min: Duration::from_millis(parse_u64(
                    "CHAT_RECONNECT_MIN_MS",
                    get("CHAT_RECONNECT_MIN_MS"),
                    DEFAULT_RECONNECT_MIN_MS,
                )?),
                max: Duration::from_millis(parse_u64(
                    "CHAT_RECONNECT_MAX_MS",
                    get("CHAT_RECONNECT_MAX_MS"),
                    DEFAULT_RECONNECT_MAX_MS,
                )?),
            },
            auto_rejoin: parse_bool("CHAT_AUTO_REJOIN", get("CHAT_AUTO_REJOIN"), false)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if ws_url(&self.endpoint, &self.ws_path).is_none() {
            return Err(ConfigError::InvalidEndpoint(self.endpoint.clone()));
        }
        if self.room.trim().is_empty() {
            return Err(ConfigError::EmptyRoom);
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("CHAT_CONNECT_TIMEOUT_MS"));
        }
        if self.reconnect.min.is_zero() {
            return Err(ConfigError::ZeroDuration("CHAT_RECONNECT_MIN_MS"));
        }
        if self.reconnect.min > self.reconnect.max {
            return Err(ConfigError::BackoffBounds {
                min_ms: self.reconnect.min.as_millis(),
                max_ms: self.reconnect.max.as_millis(),
            });
        }
        Ok(())
    }
}

/// Convert a base endpoint plus socket path into a websocket URL.
///
/// `http` maps to `ws`, `https` to `wss`; websocket schemes pass through.
#[must_use]
pub fn ws_url(endpoint: &str, path: &str) -> Option<String> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    let path = path.trim();
    let path = if path.is_empty() || path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };

    let (scheme, rest) = if let Some(rest) = trimmed.strip_prefix("http://") {
        ("ws", rest)
    } else if let Some(rest) = trimmed.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = trimmed.strip_prefix("ws://") {
        ("ws", rest)
    } else if let Some(rest) = trimmed.strip_prefix("wss://") {
        ("wss", rest)
    } else {
        return None;
    };

    if rest.is_empty() {
        return None;
    }
    Some(format!("{scheme}://{rest}{path}"))
}

fn parse_u64(key: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { key, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
