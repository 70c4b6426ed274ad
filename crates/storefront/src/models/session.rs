//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use serde::{Deserialize, Serialize};

use clover_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's login name, shown in the page header.
    pub username: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the session-held shopping cart.
    pub const CART: &str = "cart";

    /// Key for the per-session anti-forgery token.
    pub const CSRF_TOKEN: &str = "csrf_token";
}
