//! Environment-driven server configuration

use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid value {value:?} for {name}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

/// Runtime settings for the biztime server
#[derive(Debug, Clone)]
pub struct Config {
    /// sqlx connection string for the SQLite store
    pub database_url: String,
    /// Interface to bind the listener to
    pub bind: String,
    pub port: u16,
    /// Upper bound on pooled store connections
    pub max_connections: u32,
    /// Default tracing filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:biztime.db".to_string(),
            bind: "0.0.0.0".to_string(),
            port: 3000,
            max_connections: 5,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    /// Returns an error if a numeric variable is set but does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            bind: lookup("BIZTIME_BIND").unwrap_or(defaults.bind),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            max_connections: parse_var(&lookup, "BIZTIME_MAX_CONNECTIONS", defaults.max_connections)?,
            log_level: lookup("BIZTIME_LOG").unwrap_or(defaults.log_level),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value.parse().map_err(|_| ConfigError { name, value }),
        None => Ok(default),
    }
}
