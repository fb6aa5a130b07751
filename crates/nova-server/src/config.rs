//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development, including without a database.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use nova_shared::constants::{DEFAULT_HTTP_PORT, ENV_NOVA_ENV, ENV_NOVA_LOG_LEVEL, PROD_LOG_DIR};
use nova_shared::VersionInfo;
use nova_store::PoolOptions;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `NOVA_HTTP_ADDR`
    /// Default: `0.0.0.0:8000`
    pub http_addr: SocketAddr,

    /// Deployment environment, lowercased. Only `prod` changes behavior.
    /// Env: `NOVA_ENV`
    /// Default: `dev`
    pub environment: String,

    /// Log level used when `RUST_LOG` is unset.
    /// Env: `NOVA_LOG_LEVEL`
    /// Default: `debug`
    pub log_level: String,

    /// Directory for `nova.log`.
    /// Env: `NOVA_LOG_DIR`
    /// Default: `/var/log/nova` in prod, `./logs` otherwise.
    pub log_dir: PathBuf,

    /// Explicitly configured database URL. Takes precedence over
    /// `NOVA_DATABASE_URL` / `DATABASE_URL`, which are resolved by the store.
    /// Not read from the environment.
    pub database_url: Option<String>,

    /// Static version block surfaced in every response `meta`.
    /// Env: `NOVA_BUILD`, `NOVA_BUILD_DATE`, `NOVA_API_SCHEMA_VERSION`,
    /// `NOVA_MASTER_DOC_VERSION`
    pub version: VersionInfo,

    /// Pool construction tuning.
    /// Env: `NOVA_DB_MAX_RETRIES`, `NOVA_DB_BACKOFF_MS`, `NOVA_DB_MAX_CONNECTIONS`
    pub pool: PoolOptions,

    /// Origins allowed by CORS (credentials are allowed for these).
    pub cors_origins: Vec<String>,

    /// Rejected environment values. Config is loaded before the log
    /// subscriber exists, so these are reported by [`ServerConfig::log_warnings`].
    pub warnings: Vec<ConfigWarning>,
}

/// An environment variable whose value was ignored in favor of the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: &'static str,
    pub value: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            environment: "dev".to_string(),
            log_level: "debug".to_string(),
            log_dir: log_dir_for("dev"),
            database_url: None,
            version: VersionInfo::default(),
            pool: PoolOptions::default(),
            cors_origins: vec![
                "http://localhost".to_string(),
                "http://127.0.0.1".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            warnings: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("NOVA_HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                config.reject("NOVA_HTTP_ADDR", addr);
            }
        }

        if let Some(env) = lookup(ENV_NOVA_ENV) {
            if !env.trim().is_empty() {
                config.environment = env.trim().to_lowercase();
            }
        }

        config.log_dir = match lookup("NOVA_LOG_DIR") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => log_dir_for(&config.environment),
        };

        if let Some(level) = lookup(ENV_NOVA_LOG_LEVEL) {
            config.log_level = level.trim().to_lowercase();
        }

        // -- Version block --

        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        config.version.build = non_empty("NOVA_BUILD");
        config.version.build_date = non_empty("NOVA_BUILD_DATE");
        if let Some(schema) = non_empty("NOVA_API_SCHEMA_VERSION") {
            config.version.api_schema_version = Some(schema);
        }
        config.version.master_doc_version = non_empty("NOVA_MASTER_DOC_VERSION");

        // -- Pool tuning --

        if let Some(val) = lookup("NOVA_DB_MAX_RETRIES") {
            match val.parse::<u32>() {
                Ok(n) => config.pool.max_retries = n,
                Err(_) => config.reject("NOVA_DB_MAX_RETRIES", val),
            }
        }

        if let Some(val) = lookup("NOVA_DB_BACKOFF_MS") {
            match val.parse::<u64>() {
                Ok(ms) => config.pool.backoff = Duration::from_millis(ms),
                Err(_) => config.reject("NOVA_DB_BACKOFF_MS", val),
            }
        }

        if let Some(val) = lookup("NOVA_DB_MAX_CONNECTIONS") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.pool.max_connections = n,
                _ => config.reject("NOVA_DB_MAX_CONNECTIONS", val),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // and the database URL env vars by nova-store.

        config
    }

    pub fn is_prod(&self) -> bool {
        self.environment == "prod"
    }

    /// Emit one warning per rejected environment value.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!(
                event_type = "config_invalid",
                key = warning.key,
                value = %warning.value,
                "Invalid configuration value, using default"
            );
        }
    }

    fn reject(&mut self, key: &'static str, value: String) {
        self.warnings.push(ConfigWarning { key, value });
    }
}

/// `prod` logs to `/var/log/nova`, everything else to `./logs`.
pub fn log_dir_for(environment: &str) -> PathBuf {
    if environment == "prod" {
        PathBuf::from(PROD_LOG_DIR)
    } else {
        PathBuf::from("logs")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8000).into());
        assert_eq!(config.environment, "dev");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert!(config.database_url.is_none());
        assert_eq!(config.pool, PoolOptions::default());
        assert_eq!(config.cors_origins.len(), 4);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_prod_uses_system_log_dir() {
        let config = ServerConfig::from_lookup(lookup(&[("NOVA_ENV", "PROD")]));
        assert!(config.is_prod());
        assert_eq!(config.log_dir, PathBuf::from("/var/log/nova"));
    }

    #[test]
    fn test_log_dir_override() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("NOVA_ENV", "prod"),
            ("NOVA_LOG_DIR", "/tmp/nova-logs"),
        ]));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/nova-logs"));
    }

    #[test]
    fn test_version_block_from_env() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("NOVA_BUILD", "42"),
            ("NOVA_BUILD_DATE", "2025-11-01"),
            ("NOVA_MASTER_DOC_VERSION", "3.2"),
        ]));
        assert_eq!(config.version.build.as_deref(), Some("42"));
        assert_eq!(config.version.build_date.as_deref(), Some("2025-11-01"));
        assert_eq!(config.version.api_schema_version.as_deref(), Some("v1"));
        assert_eq!(config.version.master_doc_version.as_deref(), Some("3.2"));
    }

    #[test]
    fn test_pool_tuning_and_bad_values() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("NOVA_DB_MAX_RETRIES", "5"),
            ("NOVA_DB_BACKOFF_MS", "250"),
            ("NOVA_DB_MAX_CONNECTIONS", "0"),
            ("NOVA_HTTP_ADDR", "not-an-addr"),
        ]));
        assert_eq!(config.pool.max_retries, 5);
        assert_eq!(config.pool.backoff, Duration::from_millis(250));
        assert_eq!(config.pool.max_connections, 5);
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8000).into());

        let rejected: Vec<&str> = config.warnings.iter().map(|w| w.key).collect();
        assert_eq!(rejected, ["NOVA_HTTP_ADDR", "NOVA_DB_MAX_CONNECTIONS"]);
        assert_eq!(config.warnings[0].value, "not-an-addr");
    }
}
