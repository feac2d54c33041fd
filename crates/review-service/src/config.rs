//! Review service configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! held as a `SecretString`, so it is redacted in Debug output.

use common::config::{DatabaseConfig, LogFormat, ObservabilityConfig};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default maximum pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 20;

/// Default minimum pool size.
pub const DEFAULT_DB_MIN_CONNECTIONS: u32 = 2;

/// Default pool acquire timeout in seconds.
pub const DEFAULT_DB_ACQUIRE_TIMEOUT_SECONDS: u64 = 5;

/// Default PostgreSQL statement timeout in seconds.
pub const DEFAULT_DB_STATEMENT_TIMEOUT_SECONDS: u64 = 5;

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Default graceful shutdown drain period in seconds.
pub const DEFAULT_SHUTDOWN_DRAIN_SECONDS: u64 = 5;

/// Default tracing filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "review_service=debug,tower_http=debug";

/// Review service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL pool settings.
    pub database: DatabaseConfig,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on a single request, including its transaction.
    pub request_timeout: Duration,

    /// How long to wait after a shutdown signal before exiting.
    pub shutdown_drain: Duration,

    /// Logging settings.
    pub observability: ObservabilityConfig,

    /// Fixed seed for reviewer selection. `None` seeds from OS entropy.
    pub assignment_seed: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let max_connections =
            parse_positive(vars, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let min_connections: u32 =
            parse_or(vars, "DB_MIN_CONNECTIONS", DEFAULT_DB_MIN_CONNECTIONS)?;
        if min_connections > max_connections {
            return Err(ConfigError::InvalidValue {
                name: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "must not exceed DB_MAX_CONNECTIONS ({}), got {}",
                    max_connections, min_connections
                ),
            });
        }

        let acquire_timeout = Duration::from_secs(parse_positive(
            vars,
            "DB_ACQUIRE_TIMEOUT_SECONDS",
            DEFAULT_DB_ACQUIRE_TIMEOUT_SECONDS,
        )?);
        let statement_timeout = Duration::from_secs(parse_positive(
            vars,
            "DB_STATEMENT_TIMEOUT_SECONDS",
            DEFAULT_DB_STATEMENT_TIMEOUT_SECONDS,
        )?);
        let request_timeout = Duration::from_secs(parse_positive(
            vars,
            "REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?);
        // Zero is allowed: skip the drain entirely.
        let shutdown_drain = Duration::from_secs(parse_or(
            vars,
            "SHUTDOWN_DRAIN_SECONDS",
            DEFAULT_SHUTDOWN_DRAIN_SECONDS,
        )?);

        let log_format: LogFormat = parse_or(vars, "LOG_FORMAT", LogFormat::Text)?;

        let assignment_seed = match vars.get("ASSIGNMENT_SEED") {
            Some(value) => Some(parse_value("ASSIGNMENT_SEED", value)?),
            None => None,
        };

        Ok(Config {
            database: DatabaseConfig {
                url: SecretString::from(database_url),
                max_connections,
                min_connections,
                acquire_timeout,
                statement_timeout,
            },
            bind_address,
            request_timeout,
            shutdown_drain,
            observability: ObservabilityConfig {
                default_filter: DEFAULT_LOG_FILTER.to_string(),
                log_format,
            },
            assignment_seed,
        })
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("got '{}': {}", value, e),
    })
}

fn parse_or<T>(vars: &HashMap<String, String>, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match vars.get(name) {
        Some(value) => parse_value(name, value),
        None => Ok(default),
    }
}

fn parse_positive<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialEq + Default,
    T::Err: Display,
{
    let value = parse_or(vars, name, default)?;
    if value == T::default() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "DATABASE_URL".to_string(),
            "postgresql://localhost/reviews".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(
            config.database.url.expose_secret(),
            "postgresql://localhost/reviews"
        );
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 2);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.database.statement_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_drain, Duration::from_secs(5));
        assert_eq!(config.observability.log_format, LogFormat::Text);
        assert_eq!(config.assignment_seed, None);
    }

    #[test]
    fn test_from_vars_overrides() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("DB_MAX_CONNECTIONS".to_string(), "8".to_string());
        vars.insert("DB_MIN_CONNECTIONS".to_string(), "1".to_string());
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "10".to_string());
        vars.insert("SHUTDOWN_DRAIN_SECONDS".to_string(), "0".to_string());
        vars.insert("LOG_FORMAT".to_string(), "json".to_string());
        vars.insert("ASSIGNMENT_SEED".to_string(), "42".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.shutdown_drain, Duration::ZERO);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.assignment_seed, Some(42));
    }

    #[test]
    fn test_missing_database_url() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_blank_database_url_is_missing() {
        let vars = HashMap::from([("DATABASE_URL".to_string(), "  ".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::MissingEnvVar(_))
        ));
    }

    #[test]
    fn test_invalid_number_rejected() {
        let mut vars = base_vars();
        vars.insert("DB_MAX_CONNECTIONS".to_string(), "many".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref name, .. } if name == "DB_MAX_CONNECTIONS"
        ));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut vars = base_vars();
        vars.insert("REQUEST_TIMEOUT_SECONDS".to_string(), "0".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_min_connections_above_max_rejected() {
        let mut vars = base_vars();
        vars.insert("DB_MAX_CONNECTIONS".to_string(), "2".to_string());
        vars.insert("DB_MIN_CONNECTIONS".to_string(), "5".to_string());

        let err = Config::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("DB_MIN_CONNECTIONS"));
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let mut vars = base_vars();
        vars.insert("LOG_FORMAT".to_string(), "xml".to_string());

        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let mut vars = base_vars();
        vars.insert(
            "DATABASE_URL".to_string(),
            "postgresql://app:hunter2@db/reviews".to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();

        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
    }
}
