//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. A `.env` file in the working directory is read first by the
//! binary (see `main.rs`).
//!
//! | Variable                    | Default      |
//! |-----------------------------|--------------|
//! | `GARAGE_HTTP_PORT`          | `8080`       |
//! | `GARAGE_DATABASE_PATH`      | `garage.db`  |
//! | `GARAGE_MAX_CONNECTIONS`    | `5`          |
//! | `GARAGE_TX_TIMEOUT_MS`      | `10000`      |
//! | `GARAGE_BUSY_TIMEOUT_MS`    | `5000`       |
//! | `GARAGE_PAYMENT_TERMS_DAYS` | `30`         |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use garage_core::DEFAULT_PAYMENT_TERMS_DAYS;
use garage_db::DbConfig;
use serde::{Deserialize, Serialize};

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file (`:memory:` for a throwaway store)
    pub database_path: String,

    /// Pool size
    pub max_connections: u32,

    /// Deadline for one ledger transaction, in milliseconds
    pub tx_timeout_ms: u64,

    /// How long a connection waits on a held write lock, in milliseconds
    pub busy_timeout_ms: u64,

    /// Days between invoice creation and due date
    pub payment_terms_days: i64,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup.
    ///
    /// `load` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = ApiConfig {
            http_port: parse_var(&lookup, "GARAGE_HTTP_PORT", 8080)?,
            database_path: lookup("GARAGE_DATABASE_PATH").unwrap_or_else(|| "garage.db".to_string()),
            max_connections: parse_var(&lookup, "GARAGE_MAX_CONNECTIONS", 5)?,
            tx_timeout_ms: parse_var(&lookup, "GARAGE_TX_TIMEOUT_MS", 10_000)?,
            busy_timeout_ms: parse_var(&lookup, "GARAGE_BUSY_TIMEOUT_MS", 5_000)?,
            payment_terms_days: parse_var(&lookup, "GARAGE_PAYMENT_TERMS_DAYS", DEFAULT_PAYMENT_TERMS_DAYS)?,
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("GARAGE_MAX_CONNECTIONS".to_string()));
        }
        if config.tx_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("GARAGE_TX_TIMEOUT_MS".to_string()));
        }
        if config.payment_terms_days < 0 {
            return Err(ConfigError::InvalidValue("GARAGE_PAYMENT_TERMS_DAYS".to_string()));
        }
        if config.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("GARAGE_DATABASE_PATH".to_string()));
        }

        Ok(config)
    }

    /// Store configuration derived from these settings.
    pub fn db_config(&self) -> DbConfig {
        let base = if self.database_path == ":memory:" {
            DbConfig::in_memory()
        } else {
            DbConfig::new(&self.database_path).max_connections(self.max_connections)
        };

        base.tx_timeout(Duration::from_millis(self.tx_timeout_ms))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
            .payment_terms_days(self.payment_terms_days)
    }

    /// Socket address the server binds to.
    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.http_port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "garage.db");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.payment_terms_days, 30);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_overrides_flow_into_db_config() {
        let config = from_pairs(&[
            ("GARAGE_HTTP_PORT", "9000"),
            ("GARAGE_DATABASE_PATH", "/var/lib/garage/ledger.db"),
            ("GARAGE_MAX_CONNECTIONS", "8"),
            ("GARAGE_TX_TIMEOUT_MS", "2500"),
            ("GARAGE_PAYMENT_TERMS_DAYS", "14"),
        ])
        .unwrap();

        let db = config.db_config();
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.tx_timeout, Duration::from_millis(2_500));
        assert_eq!(db.busy_timeout, Duration::from_millis(5_000));
        assert_eq!(db.payment_terms_days, 14);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            from_pairs(&[("GARAGE_HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue(key)) if key == "GARAGE_HTTP_PORT"
        ));
        assert!(matches!(
            from_pairs(&[("GARAGE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            from_pairs(&[("GARAGE_PAYMENT_TERMS_DAYS", "-1")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            from_pairs(&[("GARAGE_DATABASE_PATH", "  ")]),
            Err(ConfigError::MissingRequired(_))
        ));
    }
}
