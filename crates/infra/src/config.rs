//! Store configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const DEFAULT_DATABASE_PATH: &str = "inventario_ptar.db";
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONNECTIONS: u32 = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    /// Private in-memory database; only meaningful with a single connection.
    InMemory,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub location: DatabaseLocation,
    pub busy_timeout: Duration,
    pub max_connections: u32,
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DATABASE_PATH)
    }
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: DatabaseLocation::File(path.into()),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            retry: RetryPolicy::default(),
        }
    }

    /// Throwaway database for tests.
    pub fn in_memory() -> Self {
        Self {
            location: DatabaseLocation::InMemory,
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Read `PTAR_*` variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`StoreConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup("PTAR_DATABASE_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) if path.trim() == ":memory:" => Self::in_memory(),
            Some(path) => Self::file(path.trim()),
            None => Self::default(),
        };

        if let Some(ms) = parse_var::<u64>(&lookup, "PTAR_BUSY_TIMEOUT_MS")? {
            config.busy_timeout = Duration::from_millis(ms);
        }
        if let Some(max) = parse_var::<u32>(&lookup, "PTAR_MAX_CONNECTIONS")? {
            if max == 0 {
                return Err(ConfigError::Invalid {
                    var: "PTAR_MAX_CONNECTIONS",
                    value: max.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            if config.location != DatabaseLocation::InMemory {
                config.max_connections = max;
            }
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "PTAR_RETRY_ATTEMPTS")? {
            config.retry.max_attempts = attempts.max(1);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "PTAR_RETRY_BASE_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        })
}
