//! Stat store configuration from environment variables

use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "data/gamestats.db";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 59;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, reason } => {
                write!(f, "Invalid value for {}: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Loaded from environment variables with defaults
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// TTL shared by every report and stat cache
    pub cache_ttl_secs: u64,

    pub rust_log: String,
}

impl StatsConfig {
    /// Environment variables:
    /// - `GAMESTATS_DB_PATH` (default: data/gamestats.db)
    /// - `GAMESTATS_CACHE_TTL_SECS` (default: 59)
    /// - `RUST_LOG` (default: info)
    ///
    /// Unparsable numbers fall back to their default.
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("GAMESTATS_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),

            cache_ttl_secs: env::var("GAMESTATS_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_path.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "GAMESTATS_DB_PATH",
                reason: "must not be empty".to_string(),
            });
        }

        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "GAMESTATS_CACHE_TTL_SECS",
                reason: "must be at least 1 second".to_string(),
            });
        }

        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            rust_log: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}
