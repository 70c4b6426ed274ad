//! User and customer-profile domain types.
//!
//! `User` is the authentication identity; `Customer` is the 1:1
//! address/contact profile attached to it. The password hash never appears
//! on the domain type - it is fetched separately for verification only.

use chrono::{DateTime, Utc};

use clover_core::{CustomerId, Email, UserId};

/// An authenticated account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Contact email address.
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// "First Last", or the username when both name fields are blank.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }
}

/// The address/contact profile attached 1:1 to a [`User`].
///
/// Created lazily: at registration, at first checkout, or via the staff
/// user-management form. Exactly one per user.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
