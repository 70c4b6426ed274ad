//! Integration-test support for Clover Goods.
//!
//! Tests run against an in-memory SQLite database with the real migrations
//! applied. The pool is capped at a single connection so every test sees one
//! coherent in-memory database.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p clover-integration-tests
//! ```

// Test-support code; unwraps here fail the test that called them.
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use clover_storefront::db::{CategoryRepository, MIGRATOR, ProductRepository};
use clover_storefront::models::{Cart, Category, Product, User};
use clover_storefront::services::auth::AuthService;

/// Password used for every fixture user.
pub const TEST_PASSWORD: &str = "a strong password";

/// Fresh in-memory database with migrations applied.
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    MIGRATOR.run(&pool).await.unwrap();

    pool
}

/// Create a category.
pub async fn seed_category(pool: &SqlitePool, name: &str) -> Category {
    CategoryRepository::new(pool)
        .create(name, "seeded for tests")
        .await
        .unwrap()
}

/// Create a product with the given price and stock, outside any category.
pub async fn seed_product(pool: &SqlitePool, name: &str, price: &str, stock: i64) -> Product {
    ProductRepository::new(pool)
        .create(name, Decimal::from_str(price).unwrap(), "seeded for tests", stock, None)
        .await
        .unwrap()
}

/// Register a user (and their empty customer profile).
pub async fn register_user(pool: &SqlitePool, username: &str) -> User {
    AuthService::new(pool)
        .register(
            username,
            &format!("{username}@example.com"),
            TEST_PASSWORD,
            TEST_PASSWORD,
        )
        .await
        .unwrap()
}

/// Build a cart holding the given products and quantities, snapshotting
/// their current names and prices the way the add-to-cart handler does.
pub fn cart_with(items: &[(&Product, u32)]) -> Cart {
    let mut cart = Cart::new();
    for (product, quantity) in items {
        cart.add(product.id, &product.name, product.price, *quantity);
    }
    cart
}
