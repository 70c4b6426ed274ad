//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! clover-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - SQLite connection string (falls back to
//!   `DATABASE_URL`)
//!
//! Migrations are embedded into the storefront crate at compile time from
//! `crates/storefront/migrations/`, so this command works from any working
//! directory.

use tracing::info;

use clover_storefront::db::MIGRATOR;

/// Run database migrations.
///
/// # Errors
///
/// Returns an error if the environment is missing the database URL or if a
/// migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to database...");
    let pool = super::connect().await?;

    info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    info!("Migrations complete!");
    Ok(())
}
