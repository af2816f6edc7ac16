//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use application::{AuthConfig, RetryConfig};
use thiserror::Error;

/// A variable was present but could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid value {value:?} for {key}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` bind address (default: `"0.0.0.0"`)
/// - `PORT` listen port (default: `3000`)
/// - `RUST_LOG` tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` `text` or `json` (default: `text`)
/// - `DATABASE_URL` Postgres connection string; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS` pool size (default: `10`)
/// - `MAX_RETRY_COUNT` attempts per optimistic write (default: `3`)
/// - `RETRY_BACKOFF_MS` pause between attempts (default: `0`)
/// - `AUTH_SECRET` password pepper (default: empty)
/// - `TOKEN_TTL_MINUTES` bearer token lifetime (default: `30`)
/// - `PASSWORD_HASH_MEMORY_KIB`, `PASSWORD_HASH_ITERATIONS` Argon2 cost
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub retry: RetryConfig,
    pub auth: AuthConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let log_format = match get("LOG_FORMAT") {
            None => defaults.log_format,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "text" | "pretty" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError {
                        key: "LOG_FORMAT",
                        value,
                    });
                }
            },
        };

        let backoff_ms: u64 = parse_or(&get, "RETRY_BACKOFF_MS", 0)?;
        let ttl_minutes: u64 = parse_or(&get, "TOKEN_TTL_MINUTES", 30)?;

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            database_url: get("DATABASE_URL"),
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", defaults.max_connections)?,
            retry: RetryConfig {
                max_attempts: parse_or(&get, "MAX_RETRY_COUNT", defaults.retry.max_attempts)?,
                backoff: Duration::from_millis(backoff_ms),
            },
            auth: AuthConfig {
                secret: get("AUTH_SECRET").unwrap_or_default(),
                token_ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
                hash_memory_kib: parse_or(
                    &get,
                    "PASSWORD_HASH_MEMORY_KIB",
                    defaults.auth.hash_memory_kib,
                )?,
                hash_iterations: parse_or(
                    &get,
                    "PASSWORD_HASH_ITERATIONS",
                    defaults.auth.hash_iterations,
                )?,
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { key, value }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            max_connections: 10,
            retry: RetryConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}
