//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (postgres backend only)
//! - `CLIENTELE_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `CLIENTELE_STORE` - Record store backend, `postgres` or `memory` (default: postgres)
//! - `CLIENTELE_HOST` - Bind address (default: 127.0.0.1)
//! - `CLIENTELE_PORT` - Listen port (default: 5550)
//! - `CLIENTELE_DEFAULT_PAGE_SIZE` - Page size when none is requested (default: 10)
//! - `CLIENTELE_MAX_PAGE_SIZE` - Largest page size honored (default: 100)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

use clientele_core::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageLimits};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Which record store answers queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// `PostgreSQL` via a sqlx pool.
    #[default]
    Postgres,
    /// Empty in-memory store, for local smoke testing.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend {other:?} (expected postgres or memory)")),
        }
    }
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Record store backend
    pub store: StoreBackend,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Default and maximum page sizes
    pub page_limits: PageLimits,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let store: StoreBackend = env.parse_or("CLIENTELE_STORE", "postgres")?;
        let database_url = match store {
            StoreBackend::Postgres => Some(env.database_url("CLIENTELE_DATABASE_URL")?),
            StoreBackend::Memory => env.optional_database_url("CLIENTELE_DATABASE_URL"),
        };
        let host = env.parse_or("CLIENTELE_HOST", "127.0.0.1")?;
        let port = env.parse_or("CLIENTELE_PORT", "5550")?;
        let default_limit: u64 =
            env.parse_or("CLIENTELE_DEFAULT_PAGE_SIZE", &DEFAULT_PAGE_SIZE.to_string())?;
        let max_limit: u64 = env.parse_or("CLIENTELE_MAX_PAGE_SIZE", &MAX_PAGE_SIZE.to_string())?;
        if default_limit == 0 || max_limit == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "CLIENTELE_DEFAULT_PAGE_SIZE/CLIENTELE_MAX_PAGE_SIZE".to_string(),
                "page sizes must be positive".to_string(),
            ));
        }

        Ok(Self {
            store,
            database_url,
            host,
            port,
            page_limits: PageLimits::new(default_limit, max_limit),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parse_or("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parse_or("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// A variable source. Blank values count as unset.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional environment variable.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Parse an environment variable, using `default` when it is unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn optional_database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }

    fn database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.optional_database_url(primary_key)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }
}
