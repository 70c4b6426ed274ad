//! Authentication service.
//!
//! Registration, login, and staff-side account management. Passwords are
//! hashed with Argon2id and never stored or logged in clear.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::SqlitePool;

use clover_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::customers::CustomerRepository;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
///
/// Handles user registration, login, and staff-side user management.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    customers: CustomerRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self {
            users: UserRepository::new(pool),
            customers: CustomerRepository::new(pool),
        }
    }

    /// Register a new user with username, email and password.
    ///
    /// An empty customer profile is created alongside the account, ready for
    /// the first checkout.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidUsername` / `InvalidEmail` for malformed
    /// identity fields, `PasswordMismatch` / `WeakPassword` for password
    /// problems, and `UserAlreadyExists` if the username is taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, AuthError> {
        let username = validate_username(username)?;
        let email = Email::parse(email)?;

        if password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(username, &email, "", "", &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        self.customers.find_or_create(user.id).await?;

        Ok(user)
    }

    /// Login with username and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the username/password is
    /// wrong. Absent users and wrong passwords are indistinguishable to the
    /// caller.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let (user, password_hash) = self
            .users
            .get_password_hash(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Create a user from the staff management form, with a customer profile.
    ///
    /// # Errors
    ///
    /// Same validation failures as [`Self::register`].
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = validate_username(username)?;
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(username, &email, first_name, last_name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        self.customers.find_or_create(user.id).await?;

        Ok(user)
    }

    /// Update a user's account fields from the staff management form.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist and
    /// `UserAlreadyExists` if the new username is taken.
    pub async fn update_user(
        &self,
        id: UserId,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), AuthError> {
        let username = validate_username(username)?;
        let email = Email::parse(email)?;

        self.users
            .update(id, username, &email, first_name, last_name)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }
}

/// Validate a username: trimmed, non-empty.
fn validate_username(username: &str) -> Result<&str, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::InvalidUsername("username cannot be empty".into()));
    }
    Ok(username)
}

/// Validate password strength.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password with Argon2id and a fresh random salt.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_password_length_validation() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_username_validation() {
        assert!(matches!(
            validate_username("   "),
            Err(AuthError::InvalidUsername(_))
        ));
        assert_eq!(validate_username(" alice ").unwrap(), "alice");
    }
}
