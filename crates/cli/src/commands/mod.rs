//! CLI subcommands.

pub mod check;
pub mod migrate;

use sqlx::PgPool;
use thiserror::Error;

use clientele_api::config::{ApiConfig, ConfigError};
use clientele_api::db::{self, RepositoryError};
use clientele_api::services::QueryError;

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),
}

/// Connect to the database named by the API configuration.
async fn connect() -> Result<PgPool, CommandError> {
    let config = ApiConfig::from_env()?;
    let database_url = config
        .database_url
        .as_ref()
        .ok_or(CommandError::MissingEnvVar("CLIENTELE_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(db::create_pool(database_url).await?)
}
