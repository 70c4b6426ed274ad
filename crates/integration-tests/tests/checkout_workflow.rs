//! End-to-end tests for the checkout workflow: totals, stock mutation,
//! atomic rollback, and concurrent checkouts racing for the last unit.

#![allow(clippy::unwrap_used)]

use std::str::FromStr;

use rust_decimal::Decimal;

use clover_core::OrderStatus;
use clover_integration_tests::{cart_with, register_user, seed_product, test_pool};
use clover_storefront::db::{CustomerRepository, OrderFilter, OrderRepository, ProductRepository};
use clover_storefront::models::Cart;
use clover_storefront::services::checkout::{CheckoutError, CheckoutService, ShippingForm};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[tokio::test]
async fn checkout_computes_total_and_lines_from_cart_snapshots() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let a = seed_product(&pool, "Teapot", "10.00", 10).await;
    let b = seed_product(&pool, "Mug", "5.00", 10).await;

    let cart = cart_with(&[(&a, 2), (&b, 1)]);

    let order = CheckoutService::new(&pool)
        .place_order(user.id, &cart, &ShippingForm::default())
        .await
        .unwrap();

    assert_eq!(order.total_amount, dec("25.00"));
    assert_eq!(order.status, OrderStatus::Pending);

    let lines = OrderRepository::new(&pool).lines(order.id).await.unwrap();
    assert_eq!(lines.len(), 2);

    let teapot = lines.iter().find(|l| l.product_id == a.id).unwrap();
    assert_eq!(teapot.quantity, 2);
    assert_eq!(teapot.unit_price, dec("10.00"));
}

#[tokio::test]
async fn checkout_decrements_stock_exactly_to_zero() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let product = seed_product(&pool, "Teapot", "10.00", 3).await;

    let cart = cart_with(&[(&product, 3)]);

    CheckoutService::new(&pool)
        .place_order(user.id, &cart, &ShippingForm::default())
        .await
        .unwrap();

    let after = ProductRepository::new(&pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 0);
}

#[tokio::test]
async fn checkout_total_uses_cart_snapshot_not_current_price() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;

    let cart = cart_with(&[(&product, 1)]);

    // Price rises after the product went into the cart.
    ProductRepository::new(&pool)
        .update(product.id, "Teapot", dec("99.00"), "seeded for tests", 10, None)
        .await
        .unwrap();

    let order = CheckoutService::new(&pool)
        .place_order(user.id, &cart, &ShippingForm::default())
        .await
        .unwrap();

    assert_eq!(order.total_amount, dec("10.00"));
}

#[tokio::test]
async fn empty_cart_is_rejected_without_touching_anything() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let product = seed_product(&pool, "Teapot", "10.00", 5).await;

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &Cart::new(), &ShippingForm::default())
        .await;

    assert!(matches!(result, Err(CheckoutError::EmptyCart)));

    let orders = OrderRepository::new(&pool)
        .list(OrderFilter::default())
        .await
        .unwrap();
    assert!(orders.is_empty());

    let after = ProductRepository::new(&pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 5);
}

#[tokio::test]
async fn oversized_quantity_is_rejected_with_no_order_and_no_stock_change() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let product = seed_product(&pool, "Teapot", "10.00", 1).await;

    let cart = cart_with(&[(&product, 2)]);

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &cart, &ShippingForm::default())
        .await;

    assert!(matches!(
        result,
        Err(CheckoutError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        })
    ));

    let orders = OrderRepository::new(&pool)
        .list(OrderFilter::default())
        .await
        .unwrap();
    assert!(orders.is_empty());

    let after = ProductRepository::new(&pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 1);
}

#[tokio::test]
async fn failed_checkout_rolls_back_the_address_update_too() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let in_stock = seed_product(&pool, "Mug", "5.00", 10).await;
    let scarce = seed_product(&pool, "Teapot", "10.00", 0).await;

    // Give the profile a known address first.
    let customers = CustomerRepository::new(&pool);
    let mut customer = customers.find_or_create(user.id).await.unwrap();
    customer.city = "Springfield".to_owned();
    customers.update(&customer).await.unwrap();

    let cart = cart_with(&[(&in_stock, 1), (&scarce, 1)]);
    let shipping = ShippingForm {
        city: Some("Shelbyville".to_owned()),
        ..ShippingForm::default()
    };

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &cart, &shipping)
        .await;
    assert!(matches!(result, Err(CheckoutError::InsufficientStock { .. })));

    // The address write happened inside the same transaction as the failed
    // stock decrement, so it must be gone.
    let after = customers.find_or_create(user.id).await.unwrap();
    assert_eq!(after.city, "Springfield");

    // And the in-stock product was not decremented.
    let mug = ProductRepository::new(&pool)
        .get(in_stock.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mug.stock, 10);
}

#[tokio::test]
async fn checkout_applies_partial_address_update() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let product = seed_product(&pool, "Teapot", "10.00", 5).await;

    let customers = CustomerRepository::new(&pool);
    let mut customer = customers.find_or_create(user.id).await.unwrap();
    customer.phone = "555-0100".to_owned();
    customer.city = "Springfield".to_owned();
    customers.update(&customer).await.unwrap();

    let cart = cart_with(&[(&product, 1)]);
    let shipping = ShippingForm {
        address: Some("2 New Street".to_owned()),
        city: Some(String::new()),
        ..ShippingForm::default()
    };

    CheckoutService::new(&pool)
        .place_order(user.id, &cart, &shipping)
        .await
        .unwrap();

    let after = customers.find_or_create(user.id).await.unwrap();
    assert_eq!(after.address, "2 New Street");
    // Blank and absent fields retained their prior values.
    assert_eq!(after.city, "Springfield");
    assert_eq!(after.phone, "555-0100");
}

#[tokio::test]
async fn checkout_creates_the_customer_profile_at_most_once() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;

    let service = CheckoutService::new(&pool);
    for _ in 0..3 {
        let cart = cart_with(&[(&product, 1)]);
        service
            .place_order(user.id, &cart, &ShippingForm::default())
            .await
            .unwrap();
    }

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE user_id = ?")
        .bind(user.id.as_i64())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn concurrent_checkouts_for_the_last_unit_sell_it_exactly_once() {
    let pool = test_pool().await;
    let alice = register_user(&pool, "alice").await;
    let bob = register_user(&pool, "bob").await;
    let product = seed_product(&pool, "Teapot", "10.00", 1).await;

    let cart_a = cart_with(&[(&product, 1)]);
    let cart_b = cart_with(&[(&product, 1)]);

    let pool_a = pool.clone();
    let pool_b = pool.clone();
    let task_a = tokio::spawn(async move {
        CheckoutService::new(&pool_a)
            .place_order(alice.id, &cart_a, &ShippingForm::default())
            .await
    });
    let task_b = tokio::spawn(async move {
        CheckoutService::new(&pool_b)
            .place_order(bob.id, &cart_b, &ShippingForm::default())
            .await
    });

    let result_a = task_a.await.unwrap();
    let result_b = task_b.await.unwrap();

    let successes = [&result_a, &result_b]
        .iter()
        .filter(|r| r.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one checkout must win the last unit");

    let loser = if result_a.is_ok() { result_b } else { result_a };
    assert!(matches!(
        loser,
        Err(CheckoutError::InsufficientStock { .. })
    ));

    // Stock never goes negative.
    let after = ProductRepository::new(&pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.stock, 0);

    let orders = OrderRepository::new(&pool)
        .list(OrderFilter::default())
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
async fn checkout_against_a_deleted_product_rolls_back() {
    let pool = test_pool().await;
    let user = register_user(&pool, "alice").await;
    let keep = seed_product(&pool, "Mug", "5.00", 10).await;
    let doomed = seed_product(&pool, "Teapot", "10.00", 10).await;

    let cart = cart_with(&[(&keep, 1), (&doomed, 1)]);

    // The product disappears between add-to-cart and checkout.
    ProductRepository::new(&pool).delete(doomed.id).await.unwrap();

    let result = CheckoutService::new(&pool)
        .place_order(user.id, &cart, &ShippingForm::default())
        .await;
    assert!(matches!(result, Err(CheckoutError::ProductMissing { .. })));

    let orders = OrderRepository::new(&pool)
        .list(OrderFilter::default())
        .await
        .unwrap();
    assert!(orders.is_empty());

    let mug = ProductRepository::new(&pool)
        .get(keep.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mug.stock, 10);
}
