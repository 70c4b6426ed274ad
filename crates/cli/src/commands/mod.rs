//! CLI subcommand implementations.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::SqlitePool;

/// Connect to the database named by `STOREFRONT_DATABASE_URL` (with the
/// generic `DATABASE_URL` as fallback).
pub(crate) async fn connect() -> Result<SqlitePool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")?;

    let pool = clover_storefront::db::create_pool(&database_url).await?;
    Ok(pool)
}
