//! User repository for database operations.
//!
//! The password hash never rides on the domain type; it is fetched only by
//! [`UserRepository::get_password_hash`] for verification at login time.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use clover_core::{Email, UserId};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all users, by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
                .fetch_all(self.pool)
                .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id.as_i64())
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?"))
                .bind(username)
                .fetch_optional(self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user with an already-hashed password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        username: &str,
        email: &Email,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let now = Utc::now();
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email.as_str())
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "username already exists"))?;

        User::try_from(row)
    }

    /// Update a user's account fields. The password is untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new username is taken.
    pub async fn update(
        &self,
        id: UserId,
        username: &str,
        email: &Email,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, first_name = ?, last_name = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(username)
        .bind(email.as_str())
        .bind(first_name)
        .bind(last_name)
        .bind(Utc::now())
        .bind(id.as_i64())
        .execute(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "username already exists"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a user. The customer profile is cascade-deleted.
    ///
    /// # Returns
    ///
    /// Returns `true` if the user was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.as_i64())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a user's password hash by username, for login verification.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserPasswordRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;

        let Some(UserPasswordRow {
            user,
            password_hash,
        }) = row
        else {
            return Ok(None);
        };

        Ok(Some((User::try_from(user)?, password_hash)))
    }
}
