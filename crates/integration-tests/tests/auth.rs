//! Tests for registration, login, and user management invariants.

#![allow(clippy::unwrap_used)]

use clover_integration_tests::{TEST_PASSWORD, register_user, test_pool};
use clover_storefront::db::{CustomerRepository, UserRepository};
use clover_storefront::services::auth::{AuthError, AuthService};

#[tokio::test]
async fn registration_creates_user_and_empty_profile() {
    let pool = test_pool().await;

    let user = register_user(&pool, "alice").await;
    assert_eq!(user.username, "alice");
    assert_eq!(user.email.as_str(), "alice@example.com");

    let profile = CustomerRepository::new(&pool)
        .get_by_user(user.id)
        .await
        .unwrap()
        .expect("registration should create a customer profile");
    assert_eq!(profile.user_id, user.id);
    assert!(profile.address.is_empty());
}

#[tokio::test]
async fn password_is_stored_hashed_not_in_clear() {
    let pool = test_pool().await;
    register_user(&pool, "alice").await;

    let (_, hash) = UserRepository::new(&pool)
        .get_password_hash("alice")
        .await
        .unwrap()
        .unwrap();

    assert_ne!(hash, TEST_PASSWORD);
    assert!(hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn duplicate_username_is_rejected_and_first_row_unaffected() {
    let pool = test_pool().await;
    let original = register_user(&pool, "alice").await;

    let result = AuthService::new(&pool)
        .register("alice", "other@example.com", TEST_PASSWORD, TEST_PASSWORD)
        .await;
    assert!(matches!(result, Err(AuthError::UserAlreadyExists)));

    let stored = UserRepository::new(&pool)
        .get_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.id, original.id);
    assert_eq!(stored.email.as_str(), "alice@example.com");
}

#[tokio::test]
async fn login_succeeds_with_correct_credentials() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;

    let logged_in = AuthService::new(&pool)
        .login("alice", TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_user_alike() {
    let pool = test_pool().await;
    register_user(&pool, "alice").await;

    let wrong = AuthService::new(&pool).login("alice", "not the password").await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

    let unknown = AuthService::new(&pool).login("mallory", TEST_PASSWORD).await;
    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn registration_validates_passwords() {
    let pool = test_pool().await;
    let auth = AuthService::new(&pool);

    let mismatch = auth
        .register("alice", "alice@example.com", TEST_PASSWORD, "different")
        .await;
    assert!(matches!(mismatch, Err(AuthError::PasswordMismatch)));

    let weak = auth
        .register("alice", "alice@example.com", "short", "short")
        .await;
    assert!(matches!(weak, Err(AuthError::WeakPassword(_))));

    // Neither attempt created a row.
    let stored = UserRepository::new(&pool)
        .get_by_username("alice")
        .await
        .unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn staff_create_rejects_blank_password() {
    let pool = test_pool().await;

    let result = AuthService::new(&pool)
        .create_user("bob", "bob@example.com", "Bob", "Builder", "")
        .await;
    assert!(matches!(result, Err(AuthError::WeakPassword(_))));
}

#[tokio::test]
async fn deleting_a_user_cascades_to_the_profile() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;

    let deleted = UserRepository::new(&pool).delete(user.id).await.unwrap();
    assert!(deleted);

    let profile = CustomerRepository::new(&pool)
        .get_by_user(user.id)
        .await
        .unwrap();
    assert!(profile.is_none());
}

#[tokio::test]
async fn update_user_detects_username_conflicts() {
    let pool = test_pool().await;
    let _alice = register_user(&pool, "alice").await;
    let bob = register_user(&pool, "bob").await;

    let result = AuthService::new(&pool)
        .update_user(bob.id, "alice", "bob@example.com", "", "")
        .await;
    assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
}
