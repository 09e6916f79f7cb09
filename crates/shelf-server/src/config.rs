//! Configuration management
//!
//! Values come from the process environment (after loading `.env` through
//! `dotenvy`), falling back to the defaults below.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Grace period for in-flight requests on shutdown, in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/shelf";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Idle connections are closed after 10 minutes.
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

/// Audit capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// When false the HTTP capture layer forwards requests untouched
    pub capture_enabled: bool,
}

impl Config {
    /// Load `.env`, then read the environment
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from the current environment only
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            server: ServerConfig {
                host: env_or("SHELF_HOST", DEFAULT_SERVER_HOST.to_string()),
                port: env_or("SHELF_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "SHELF_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                min_connections: env_or(
                    "DATABASE_MIN_CONNECTIONS",
                    DEFAULT_DATABASE_MIN_CONNECTIONS,
                ),
                connect_timeout_secs: env_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
                idle_timeout_secs: env_or(
                    "DATABASE_IDLE_TIMEOUT",
                    DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
                ),
            },
            cors: CorsConfig {
                allowed_origins: env_or(
                    "CORS_ALLOWED_ORIGINS",
                    DEFAULT_CORS_ALLOWED_ORIGIN.to_string(),
                )
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", true),
            },
            audit: AuditConfig {
                capture_enabled: env_or("AUDIT_CAPTURE_ENABLED", true),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        if !self.audit.capture_enabled {
            tracing::warn!("Audit capture is disabled - mutating requests will not be recorded");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
            audit: AuditConfig {
                capture_enabled: true,
            },
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or does not parse
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 5] = [
        "SHELF_PORT",
        "DATABASE_MAX_CONNECTIONS",
        "DATABASE_MIN_CONNECTIONS",
        "CORS_ALLOWED_ORIGINS",
        "AUDIT_CAPTURE_ENABLED",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default().audit.capture_enabled);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("SHELF_PORT", "9100");
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example");
        std::env::set_var("AUDIT_CAPTURE_ENABLED", "false");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.cors.allowed_origins,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert!(!config.audit.capture_enabled);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_unparseable_value_uses_default() {
        clear_env();
        std::env::set_var("SHELF_PORT", "not-a-port");

        let config = Config::from_env().unwrap();
        assert_eq!(config.server.port, DEFAULT_SERVER_PORT);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_pool_bounds_rejected() {
        clear_env();
        std::env::set_var("DATABASE_MAX_CONNECTIONS", "2");
        std::env::set_var("DATABASE_MIN_CONNECTIONS", "5");

        assert!(Config::from_env().is_err());

        clear_env();
    }
}
