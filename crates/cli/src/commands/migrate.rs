//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! binary, so `tavola migrate` works from any directory. The server never
//! migrates on start-up; run this before deploying a new version.

use tavola_server::db::MIGRATOR;

use super::{CliError, connect};

/// Apply all pending migrations.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
