//! Tests for order listing and the status state machine.

#![allow(clippy::unwrap_used)]

use clover_core::{OrderStatus, ProductId};
use clover_integration_tests::{cart_with, register_user, seed_product, test_pool};
use clover_storefront::db::{OrderFilter, OrderRepository, RepositoryError};
use clover_storefront::models::Order;
use clover_storefront::services::checkout::{CheckoutService, ShippingForm};
use sqlx::SqlitePool;

async fn place_order(pool: &SqlitePool, username: &str, product_id: ProductId) -> Order {
    let user = register_user(pool, username).await;
    let product = clover_storefront::db::ProductRepository::new(pool)
        .get(product_id)
        .await
        .unwrap()
        .unwrap();
    let cart = cart_with(&[(&product, 1)]);

    CheckoutService::new(pool)
        .place_order(user.id, &cart, &ShippingForm::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn legal_transition_path_reaches_delivered() {
    let pool = test_pool().await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;
    let order = place_order(&pool, "alice", product.id).await;

    let orders = OrderRepository::new(&pool);
    for next in [
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
    ] {
        let updated = orders.update_status(order.id, next).await.unwrap();
        assert_eq!(updated.status, next);
    }
}

#[tokio::test]
async fn illegal_transitions_are_rejected_without_a_write() {
    let pool = test_pool().await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;
    let order = place_order(&pool, "alice", product.id).await;

    let orders = OrderRepository::new(&pool);

    // Skipping straight to shipped is illegal from pending.
    let result = orders.update_status(order.id, OrderStatus::Shipped).await;
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Shipped,
        })
    ));

    // The row is untouched.
    let unchanged = orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.status, OrderStatus::Pending);
}

#[tokio::test]
async fn cancelled_orders_are_terminal() {
    let pool = test_pool().await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;
    let order = place_order(&pool, "alice", product.id).await;

    let orders = OrderRepository::new(&pool);
    orders
        .update_status(order.id, OrderStatus::Cancelled)
        .await
        .unwrap();

    let result = orders.update_status(order.id, OrderStatus::Processing).await;
    assert!(matches!(
        result,
        Err(RepositoryError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn updating_a_missing_order_is_not_found() {
    let pool = test_pool().await;

    let result = OrderRepository::new(&pool)
        .update_status(clover_core::OrderId::new(4242), OrderStatus::Processing)
        .await;
    assert!(matches!(result, Err(RepositoryError::NotFound)));
}

#[tokio::test]
async fn listing_is_newest_first_and_filters_by_exact_status() {
    let pool = test_pool().await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;

    let first = place_order(&pool, "alice", product.id).await;
    let second = place_order(&pool, "bob", product.id).await;
    let third = place_order(&pool, "carol", product.id).await;

    let orders = OrderRepository::new(&pool);
    orders
        .update_status(second.id, OrderStatus::Processing)
        .await
        .unwrap();

    let all = orders.list(OrderFilter::default()).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|o| o.id.as_i64()).collect();
    assert_eq!(
        ids,
        vec![third.id.as_i64(), second.id.as_i64(), first.id.as_i64()]
    );

    let pending = orders
        .list(OrderFilter {
            status: Some(OrderStatus::Pending),
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|o| o.status == OrderStatus::Pending));

    let processing = orders
        .list(OrderFilter {
            status: Some(OrderStatus::Processing),
        })
        .await
        .unwrap();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id, second.id);
}

#[tokio::test]
async fn customers_see_only_their_own_orders() {
    let pool = test_pool().await;
    let product = seed_product(&pool, "Teapot", "10.00", 10).await;

    let alice_order = place_order(&pool, "alice", product.id).await;
    let _bob_order = place_order(&pool, "bob", product.id).await;

    let orders = OrderRepository::new(&pool)
        .list_for_customer(alice_order.customer_id)
        .await
        .unwrap();

    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, alice_order.id);
}
