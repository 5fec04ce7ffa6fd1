//! Configuration module for the scheme directory.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Deployment environment. Controls error detail and the log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err("expected development or production".to_string()),
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected pretty or json".to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// JSON array of schemes loaded into an empty store
    pub seed_path: Option<PathBuf>,
    /// Pre-shared admin key
    pub admin_key: Option<String>,
    /// Default log filter directive (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    /// Identify clients by the first `X-Forwarded-For` hop
    pub trust_forwarded_for: bool,
    /// Upper bound on a single store call
    pub store_timeout: Duration,
    /// Extra attempts for idempotent reads
    pub store_read_retries: u32,
    pub connect_attempts: u32,
    pub connect_backoff: Duration,
}

impl Config {
    /// Load configuration from environment variables (and `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment: Environment = parse(&var, "SCHEME_ENV", Environment::Development)?;

        let log_format = parse(
            &var,
            "SCHEME_LOG_FORMAT",
            match environment {
                Environment::Development => LogFormat::Pretty,
                Environment::Production => LogFormat::Json,
            },
        )?;

        let cors_origins = var("SCHEME_CORS_ORIGINS")
            .map(|list| {
                list.split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            environment,
            bind_addr: parse(&var, "SCHEME_BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 5001)))?,
            db_path: var("SCHEME_DB_PATH")
                .unwrap_or_else(|| "./data/schemes.sqlite".to_string())
                .into(),
            index_path: var("SCHEME_INDEX_PATH")
                .unwrap_or_else(|| "./data/index".to_string())
                .into(),
            seed_path: var("SCHEME_SEED_PATH").map(PathBuf::from),
            admin_key: var("SCHEME_ADMIN_KEY"),
            log_level: var("SCHEME_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
            cors_origins,
            rate_limit_window: Duration::from_secs(parse(
                &var,
                "SCHEME_RATE_LIMIT_WINDOW_SECS",
                900u64,
            )?),
            rate_limit_max_requests: parse(&var, "SCHEME_RATE_LIMIT_MAX_REQUESTS", 100u32)?,
            trust_forwarded_for: parse(&var, "SCHEME_TRUST_FORWARDED_FOR", false)?,
            store_timeout: Duration::from_millis(parse(&var, "SCHEME_STORE_TIMEOUT_MS", 10_000u64)?),
            store_read_retries: parse(&var, "SCHEME_STORE_READ_RETRIES", 2u32)?,
            connect_attempts: parse(&var, "SCHEME_CONNECT_ATTEMPTS", 5u32)?,
            connect_backoff: Duration::from_millis(parse(
                &var,
                "SCHEME_CONNECT_BACKOFF_MS",
                5_000u64,
            )?),
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn parse<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert!(config.admin_key.is_none());
        assert!(config.seed_path.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/schemes.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:5001");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.rate_limit_window, Duration::from_secs(900));
        assert_eq!(config.rate_limit_max_requests, 100);
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.store_timeout, Duration::from_secs(10));
        assert_eq!(config.store_read_retries, 2);
        assert_eq!(config.connect_attempts, 5);
        assert_eq!(config.connect_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_production_defaults_to_json_logs() {
        let config = config_from(&[("SCHEME_ENV", "production")]).unwrap();
        assert!(!config.is_development());
        assert_eq!(config.log_format, LogFormat::Json);

        let config = config_from(&[("SCHEME_ENV", "production"), ("SCHEME_LOG_FORMAT", "pretty")])
            .unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_cors_origins_list() {
        let config = config_from(&[(
            "SCHEME_CORS_ORIGINS",
            "http://localhost:3000, https://schemes.example.org,",
        )])
        .unwrap();
        assert_eq!(
            config.cors_origins,
            vec!["http://localhost:3000", "https://schemes.example.org"]
        );
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = config_from(&[("SCHEME_BIND_ADDR", "not-an-addr")]).unwrap_err();
        assert!(err.to_string().contains("SCHEME_BIND_ADDR"));

        assert!(config_from(&[("SCHEME_RATE_LIMIT_MAX_REQUESTS", "-3")]).is_err());
        assert!(config_from(&[("SCHEME_ENV", "staging")]).is_err());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = config_from(&[("SCHEME_ADMIN_KEY", "  "), ("SCHEME_LOG_LEVEL", "")]).unwrap();
        assert!(config.admin_key.is_none());
        assert_eq!(config.log_level, "info");
    }
}
