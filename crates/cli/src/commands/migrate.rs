//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! clientele-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `CLIENTELE_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! `crates/api/migrations/`, applied in file name order:
//! ```text
//! migrations/
//! ├── 20260301000001_create_customers.sql
//! └── 20260301000002_create_orders.sql
//! ```

use super::{CommandError, connect};

/// Run the API database migrations.
///
/// # Errors
///
/// Returns an error if configuration is missing, the database cannot be
/// reached, or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
