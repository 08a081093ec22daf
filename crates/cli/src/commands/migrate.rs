//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! mercurios migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SYNC_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)

use thiserror::Error;

use mercurios_sync::config::ConfigError;
use mercurios_sync::{SyncConfig, store};

/// Errors that can occur during migration.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Run the sync schema migrations.
///
/// # Errors
///
/// Returns `MigrationError` if configuration, connection, or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    let config = SyncConfig::from_env()?;

    tracing::info!("Connecting to sync database...");
    let pool = store::create_pool(&config.database_url).await?;

    tracing::info!("Running sync migrations...");
    store::MIGRATOR.run(&pool).await?;

    tracing::info!("Sync migrations complete!");
    Ok(())
}
