//! Server configuration module
//! Handles dynamic configuration parameters for the relay server

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL_SECS, DEFAULT_HOST, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_MAX_ROOM_SIZE,
    DEFAULT_PORT, DEFAULT_RATE_LIMIT_MAX_EVENTS, DEFAULT_RATE_LIMIT_WINDOW_MS, HEALTH_PATH,
    MAX_ROOM_SIZE_CEILING, MIN_ROOM_SIZE, WS_PATH,
};
use crate::error::{RelayError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Limits consumed by the relay core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayLimits {
    /// Maximum number of connections in one room
    pub max_room_size: usize,
    /// Length of one rate-limit window
    pub rate_limit_window: Duration,
    /// Events of one type admitted per connection per window
    pub rate_limit_max_events: u32,
    /// Largest inbound frame, in bytes
    pub max_message_size: usize,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            max_room_size: DEFAULT_MAX_ROOM_SIZE,
            rate_limit_window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
            rate_limit_max_events: DEFAULT_RATE_LIMIT_MAX_EVENTS,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl RelayLimits {
    /// Check every limit is inside its accepted range
    pub fn validate(&self) -> Result<()> {
        if !(MIN_ROOM_SIZE..=MAX_ROOM_SIZE_CEILING).contains(&self.max_room_size) {
            return Err(RelayError::ConfigError(format!(
                "MAX_ROOM_SIZE must be between {} and {}, got {}",
                MIN_ROOM_SIZE, MAX_ROOM_SIZE_CEILING, self.max_room_size
            )));
        }
        if self.rate_limit_window.is_zero() {
            return Err(RelayError::ConfigError(
                "Rate limit window must be greater than zero".to_string(),
            ));
        }
        if self.rate_limit_max_events == 0 {
            return Err(RelayError::ConfigError(
                "Rate limit must admit at least one event per window".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(RelayError::ConfigError(
                "Maximum message size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Route of the WebSocket endpoint, kept apart from the plain HTTP surface
    pub ws_path: String,
    pub limits: RelayLimits,
    /// Period of the expired rate-limit window purge
    pub cleanup_interval: Duration,
    /// TLS configuration
    pub tls_cert_path: Option<String>,
    pub tls_key_path: Option<String>,
    /// Enable TLS
    pub enable_tls: bool,
}

impl ServerConfig {
    /// Create a test configuration with default limits
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ws_path: WS_PATH.to_string(),
            limits: RelayLimits::default(),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECS),
            tls_cert_path: None,
            tls_key_path: None,
            enable_tls: false,
        }
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("RELAY_HOST").unwrap_or(DEFAULT_HOST.to_string());
        let port = parse_var(&lookup, &["RELAY_PORT"], DEFAULT_PORT)?;

        let ws_path = lookup("RELAY_WS_PATH")
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(WS_PATH.to_string());
        if ws_path.contains('/') || ws_path == HEALTH_PATH {
            return Err(RelayError::ConfigError(format!(
                "RELAY_WS_PATH must be a single segment other than '{}', got '{}'",
                HEALTH_PATH, ws_path
            )));
        }

        // RELAY_MAX_ROOM_SIZE wins over the bare MAX_ROOM_SIZE
        let max_room_size = parse_var(
            &lookup,
            &["RELAY_MAX_ROOM_SIZE", "MAX_ROOM_SIZE"],
            DEFAULT_MAX_ROOM_SIZE,
        )?;
        let window_ms = parse_var(
            &lookup,
            &["RELAY_RATE_LIMIT_WINDOW_MS"],
            DEFAULT_RATE_LIMIT_WINDOW_MS,
        )?;
        let rate_limit_max_events = parse_var(
            &lookup,
            &["RELAY_RATE_LIMIT_MAX_EVENTS"],
            DEFAULT_RATE_LIMIT_MAX_EVENTS,
        )?;
        let max_message_size = parse_var(
            &lookup,
            &["RELAY_MAX_MESSAGE_SIZE"],
            DEFAULT_MAX_MESSAGE_SIZE,
        )?;
        let cleanup_secs = parse_var(
            &lookup,
            &["RELAY_CLEANUP_INTERVAL_SECS"],
            DEFAULT_CLEANUP_INTERVAL_SECS,
        )?;

        let limits = RelayLimits {
            max_room_size,
            rate_limit_window: Duration::from_millis(window_ms),
            rate_limit_max_events,
            max_message_size,
        };
        limits.validate()?;

        if cleanup_secs == 0 {
            return Err(RelayError::ConfigError(
                "RELAY_CLEANUP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }

        // TLS configuration
        let enable_tls = parse_flag(&lookup, "RELAY_ENABLE_TLS")?;

        let tls_cert_path = lookup("RELAY_TLS_CERT_PATH");
        let tls_key_path = lookup("RELAY_TLS_KEY_PATH");

        // Validate TLS configuration if enabled
        if enable_tls {
            match (&tls_cert_path, &tls_key_path) {
                (Some(cert_path), Some(key_path)) => {
                    if !std::path::Path::new(cert_path).exists() {
                        return Err(RelayError::ConfigError(format!(
                            "TLS certificate file does not exist: {}",
                            cert_path
                        )));
                    }
                    if !std::path::Path::new(key_path).exists() {
                        return Err(RelayError::ConfigError(format!(
                            "TLS private key file does not exist: {}",
                            key_path
                        )));
                    }
                }
                _ => {
                    return Err(RelayError::ConfigError(
                        "TLS is enabled but RELAY_TLS_CERT_PATH or RELAY_TLS_KEY_PATH is not set"
                            .to_string(),
                    ))
                }
            }
        }

        Ok(Self {
            host,
            port,
            ws_path,
            limits,
            cleanup_interval: Duration::from_secs(cleanup_secs),
            enable_tls,
            tls_cert_path,
            tls_key_path,
        })
    }
}

/// Read the first set variable among `names`; a value that does not parse is
/// an error rather than a silent fallback.
fn parse_var<F, T>(lookup: &F, names: &[&str], default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    for name in names {
        if let Some(raw) = lookup(name) {
            return raw.trim().parse().map_err(|_| {
                RelayError::ConfigError(format!("{} is not a valid number: '{}'", name, raw))
            });
        }
    }
    Ok(default)
}

/// Read an on/off switch; unset means off, anything unrecognised is an error
fn parse_flag<F>(lookup: &F, name: &str) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(false);
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(RelayError::ConfigError(format!(
            "{} must be true or false, got '{}'",
            name, raw
        ))),
    }
}
