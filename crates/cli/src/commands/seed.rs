//! Seed the database with a starter catalog and a staff user.
//!
//! Safe to re-run: rows that already exist are skipped.

use std::str::FromStr;

use rust_decimal::Decimal;
use tracing::{info, warn};

use clover_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use clover_storefront::services::auth::{AuthError, AuthService};

const CATEGORIES: &[(&str, &str)] = &[
    ("Kitchen", "Everything for the kitchen counter"),
    ("Garden", "Tools and seeds for the garden"),
    ("Stationery", "Paper goods and writing supplies"),
];

const PRODUCTS: &[(&str, &str, &str, i64, &str)] = &[
    ("Stoneware Teapot", "19.99", "A 1.2l stoneware teapot.", 24, "Kitchen"),
    ("Chef's Knife", "54.00", "20cm forged chef's knife.", 12, "Kitchen"),
    ("Hand Trowel", "11.50", "Ash-handled hand trowel.", 40, "Garden"),
    ("Seed Starter Kit", "16.00", "30-cell seed starter tray with dome.", 18, "Garden"),
    ("Dot Grid Notebook", "9.00", "A5 dot grid notebook, 120 pages.", 60, "Stationery"),
];

/// Seed sample data.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a non-conflict write
/// fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let categories = CategoryRepository::new(&pool);
    let products = ProductRepository::new(&pool);

    for (name, description) in CATEGORIES {
        match categories.create(name, description).await {
            Ok(category) => info!(category = %category.name, "Category seeded"),
            Err(RepositoryError::Conflict(_)) => {
                warn!(category = %name, "Category already exists, skipping");
            }
            Err(other) => return Err(other.into()),
        }
    }

    let existing = categories.list().await?;
    let category_id = |name: &str| {
        existing
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
    };

    for (name, price, description, stock, category) in PRODUCTS {
        let price = Decimal::from_str(price)?;
        match products
            .create(name, price, description, *stock, category_id(category))
            .await
        {
            Ok(product) => info!(product = %product.name, "Product seeded"),
            Err(RepositoryError::Conflict(_)) => {
                warn!(product = %name, "Product already exists, skipping");
            }
            Err(other) => return Err(other.into()),
        }
    }

    match AuthService::new(&pool)
        .create_user("manager", "manager@clovergoods.example", "Store", "Manager", "change-this-soon-1")
        .await
    {
        Ok(user) => info!(user_id = %user.id, "Staff user seeded (username: manager)"),
        Err(AuthError::UserAlreadyExists) => {
            warn!("Staff user already exists, skipping");
        }
        Err(other) => return Err(other.into()),
    }

    info!("Seeding complete!");
    Ok(())
}
