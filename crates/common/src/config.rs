//! Common configuration types for the review service crates.

use crate::secret::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub url: SecretString,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections kept open
    pub min_connections: u32,
    /// How long to wait for a pooled connection
    pub acquire_timeout: Duration,
    /// Server-side `statement_timeout` applied to every session
    pub statement_timeout: Duration,
}

impl DatabaseConfig {
    /// Returns the connection URL with `statement_timeout` appended as a
    /// libpq `options` parameter, so queries can't hang indefinitely.
    #[must_use]
    pub fn url_with_statement_timeout(&self) -> SecretString {
        let url = self.url.expose_secret();
        let separator = if url.contains('?') { '&' } else { '?' };
        SecretString::from(format!(
            "{}{}options=-c%20statement_timeout%3D{}s",
            url,
            separator,
            self.statement_timeout.as_secs()
        ))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "console" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}', expected 'text' or 'json'")),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub default_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}
