//! Session middleware configuration.
//!
//! Sets up SQLite-backed sessions using tower-sessions.

use sqlx::SqlitePool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "clover_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with a SQLite store.
///
/// The store's `tower_sessions` table is created here if it doesn't exist;
/// it lives outside the application migrations because its schema belongs to
/// the store crate.
///
/// # Arguments
///
/// * `pool` - SQLite connection pool
/// * `config` - Storefront configuration (for cookie security)
///
/// # Errors
///
/// Returns `sqlx::Error` if the session table cannot be created.
pub async fn create_session_layer(
    pool: &SqlitePool,
    config: &StorefrontConfig,
) -> Result<SessionManagerLayer<SqliteStore>, sqlx::Error> {
    let store = SqliteStore::new(pool.clone());
    store.migrate().await?;

    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/"))
}
