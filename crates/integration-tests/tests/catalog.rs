//! Tests for catalog queries, uniqueness constraints, and cascade deletes.

#![allow(clippy::unwrap_used)]

use std::str::FromStr;

use rust_decimal::Decimal;

use clover_integration_tests::{seed_category, seed_product, test_pool};
use clover_storefront::db::{
    CategoryRepository, ProductQuery, ProductRepository, RepositoryError,
};

#[tokio::test]
async fn search_matches_name_or_description_case_insensitively() {
    let pool = test_pool().await;
    let products = ProductRepository::new(&pool);

    products
        .create("Stoneware Teapot", Decimal::from_str("19.99").unwrap(), "Holds 1.2l", 5, None)
        .await
        .unwrap();
    products
        .create("Mug", Decimal::from_str("5.00").unwrap(), "Matches the teapot", 5, None)
        .await
        .unwrap();
    products
        .create("Trowel", Decimal::from_str("11.50").unwrap(), "For the garden", 5, None)
        .await
        .unwrap();

    let hits = products
        .list(&ProductQuery {
            category: None,
            search: Some("TEAPOT".to_owned()),
        })
        .await
        .unwrap();

    let names: Vec<&str> = hits.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Mug", "Stoneware Teapot"]);
}

#[tokio::test]
async fn category_filter_is_exact() {
    let pool = test_pool().await;
    let kitchen = seed_category(&pool, "Kitchen").await;
    let garden = seed_category(&pool, "Garden").await;

    let products = ProductRepository::new(&pool);
    products
        .create("Teapot", Decimal::from_str("19.99").unwrap(), "", 5, Some(kitchen.id))
        .await
        .unwrap();
    products
        .create("Trowel", Decimal::from_str("11.50").unwrap(), "", 5, Some(garden.id))
        .await
        .unwrap();
    products
        .create("Uncategorized", Decimal::from_str("1.00").unwrap(), "", 5, None)
        .await
        .unwrap();

    let in_kitchen = products
        .list(&ProductQuery {
            category: Some(kitchen.id),
            search: None,
        })
        .await
        .unwrap();

    assert_eq!(in_kitchen.len(), 1);
    assert_eq!(in_kitchen[0].name, "Teapot");
}

#[tokio::test]
async fn deleting_a_category_cascades_to_its_products() {
    let pool = test_pool().await;
    let kitchen = seed_category(&pool, "Kitchen").await;

    let products = ProductRepository::new(&pool);
    let teapot = products
        .create("Teapot", Decimal::from_str("19.99").unwrap(), "", 5, Some(kitchen.id))
        .await
        .unwrap();
    let loose = seed_product(&pool, "Trowel", "11.50", 5).await;

    let deleted = CategoryRepository::new(&pool).delete(kitchen.id).await.unwrap();
    assert!(deleted);

    assert!(products.get(teapot.id).await.unwrap().is_none());
    // Products outside the category survive.
    assert!(products.get(loose.id).await.unwrap().is_some());
}

#[tokio::test]
async fn duplicate_product_name_is_a_conflict() {
    let pool = test_pool().await;
    seed_product(&pool, "Teapot", "19.99", 5).await;

    let result = ProductRepository::new(&pool)
        .create("Teapot", Decimal::from_str("24.99").unwrap(), "", 5, None)
        .await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    // The original row is unaffected.
    let all = ProductRepository::new(&pool)
        .list(&ProductQuery::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].price, Decimal::from_str("19.99").unwrap());
}

#[tokio::test]
async fn duplicate_category_name_is_a_conflict() {
    let pool = test_pool().await;
    seed_category(&pool, "Kitchen").await;

    let result = CategoryRepository::new(&pool)
        .create("Kitchen", "another one")
        .await;

    assert!(matches!(result, Err(RepositoryError::Conflict(_))));
}

#[tokio::test]
async fn product_prices_round_trip_through_storage() {
    let pool = test_pool().await;
    let product = seed_product(&pool, "Teapot", "19.99", 5).await;

    let fetched = ProductRepository::new(&pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fetched.price, Decimal::from_str("19.99").unwrap());
}

#[tokio::test]
async fn updating_a_missing_product_is_not_found() {
    let pool = test_pool().await;

    let result = ProductRepository::new(&pool)
        .update(
            clover_core::ProductId::new(4242),
            "Ghost",
            Decimal::from_str("1.00").unwrap(),
            "",
            0,
            None,
        )
        .await;

    assert!(matches!(result, Err(RepositoryError::NotFound)));
}
