use std::env;
use thiserror::Error;

use crate::constants::{DEFAULT_SERVER_PORT, DEFAULT_USERNAME_SUFFIX, MEMORY_DATABASE_SCHEME};

/// Configuration loading error
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub allowed_origins: Vec<String>,
    /// Appended to bag usernames that don't already end with it
    pub username_suffix: String,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = parse_or("SERVER_PORT", &lookup, DEFAULT_SERVER_PORT)?;

        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", &lookup, 10)?;

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let username_suffix =
            lookup("USERNAME_SUFFIX").unwrap_or_else(|| DEFAULT_USERNAME_SUFFIX.to_string());

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        Ok(Config {
            server_host,
            server_port,
            database_url,
            db_max_connections,
            allowed_origins,
            username_suffix,
            environment,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// True when DATABASE_URL selects the in-memory store
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_DATABASE_SCHEME)
    }

    /// True when any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_or<F, T>(name: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/de")]))
                .unwrap();

        assert_eq!(config.server_address(), "0.0.0.0:60000");
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.username_suffix, "@iplantcollaborative.org");
        assert_eq!(config.environment, "development");
        assert!(config.allows_any_origin());
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn test_database_url_required() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert_eq!(result.unwrap_err(), ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "memory://"),
            ("SERVER_PORT", "sixty"),
        ]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name: "SERVER_PORT",
                value: "sixty".to_string()
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "memory://"),
            ("SERVER_HOST", "127.0.0.1"),
            ("SERVER_PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://de.cyverse.org, http://localhost:3000"),
            ("USERNAME_SUFFIX", "@example.org"),
        ]))
        .unwrap();

        assert!(config.uses_memory_store());
        assert_eq!(config.server_address(), "127.0.0.1:8080");
        assert_eq!(
            config.allowed_origins,
            vec!["https://de.cyverse.org", "http://localhost:3000"]
        );
        assert!(!config.allows_any_origin());
        assert_eq!(config.username_suffix, "@example.org");
    }
}
