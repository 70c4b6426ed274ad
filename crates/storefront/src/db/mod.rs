//! Database operations for the storefront.
//!
//! # Database
//!
//! A single SQLite database holds everything:
//!
//! ## Tables
//!
//! - `users` - Site authentication
//! - `customers` - Address/contact profile, 1:1 with users
//! - `categories` / `products` - The catalog
//! - `orders` / `order_lines` - Placed orders with per-line snapshots
//! - `tower_sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/`, embedded via
//! [`MIGRATOR`], and run explicitly:
//! ```bash
//! cargo run -p clover-cli -- migrate
//! ```

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;
pub mod users;

pub use categories::CategoryRepository;
pub use customers::CustomerRepository;
pub use orders::{OrderFilter, OrderRepository};
pub use products::{ProductQuery, ProductRepository};
pub use users::UserRepository;

/// Embedded migrations for this crate's database.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique username or product name).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Rejected order-status transition.
    #[error("illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: clover_core::OrderStatus,
        to: clover_core::OrderStatus,
    },
}

impl RepositoryError {
    /// Map a sqlx error to [`RepositoryError::Conflict`] when it is a unique
    /// constraint violation, passing other errors through.
    pub(crate) fn from_unique_violation(err: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(conflict.to_owned());
        }
        Self::Database(err)
    }
}

/// Create a SQLite connection pool with sensible defaults.
///
/// Foreign key enforcement is switched on for every connection; the catalog
/// cascade rules depend on it.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(
    database_url: &secrecy::SecretString,
) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}
