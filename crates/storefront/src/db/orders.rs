//! Order repository.
//!
//! Orders are inserted only inside the checkout transaction; the `_tx`
//! methods take the open connection so the order, its lines, and the stock
//! decrements commit or roll back together.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};

use clover_core::{CustomerId, OrderId, OrderStatus, ProductId};

use super::RepositoryError;
use crate::models::{Order, OrderLine};

const ORDER_COLUMNS: &str = "id, customer_id, total_amount, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_id: i64,
    total_amount: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let total_amount = Decimal::from_str(&row.total_amount).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order total in database: {e}"))
        })?;
        let status = row.status.parse::<OrderStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order status in database: {e}"))
        })?;

        Ok(Self {
            id: OrderId::new(row.id),
            customer_id: CustomerId::new(row.customer_id),
            total_amount,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    product_id: i64,
    product_name: String,
    quantity: i64,
    unit_price: String,
}

impl TryFrom<OrderLineRow> for OrderLine {
    type Error = RepositoryError;

    fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
        let unit_price = Decimal::from_str(&row.unit_price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid line price in database: {e}"))
        })?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price,
        })
    }
}

/// Order listing filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    /// Exact status match; `None` lists every order.
    pub status: Option<OrderStatus>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an order by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` for unreadable stored values.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id.as_i64())
                .fetch_optional(self.pool)
                .await?;

        row.map(Order::try_from).transpose()
    }

    /// The lines of an order, with current product names joined in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        let rows: Vec<OrderLineRow> = sqlx::query_as(
            "SELECT l.product_id, p.name AS product_name, l.quantity, l.unit_price \
             FROM order_lines l \
             JOIN products p ON p.id = l.product_id \
             WHERE l.order_id = ? \
             ORDER BY p.name",
        )
        .bind(id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderLine::try_from).collect()
    }

    /// List orders newest-created-first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = if let Some(status) = filter.status {
            sqlx::query_as(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ? \
                 ORDER BY created_at DESC, id DESC"
            ))
            .bind(status.to_string())
            .fetch_all(self.pool)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
            ))
            .fetch_all(self.pool)
            .await?
        };

        rows.into_iter().map(Order::try_from).collect()
    }

    /// List one customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id.as_i64())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Apply a status transition after validating it against the lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::InvalidTransition` for an illegal move; the
    /// row is untouched in that case.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let order = self.get(id).await?.ok_or(RepositoryError::NotFound)?;

        if !order.status.can_transition_to(next) {
            return Err(RepositoryError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }

        let row: OrderRow = sqlx::query_as(&format!(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(next.to_string())
        .bind(Utc::now())
        .bind(id.as_i64())
        .fetch_one(self.pool)
        .await?;

        Order::try_from(row)
    }

    /// Insert a pending order, inside the checkout transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_tx(
        conn: &mut SqliteConnection,
        customer_id: CustomerId,
        total_amount: Decimal,
    ) -> Result<Order, RepositoryError> {
        let now = Utc::now();
        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO orders (customer_id, total_amount, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(customer_id.as_i64())
        .bind(format!("{total_amount:.2}"))
        .bind(OrderStatus::Pending.to_string())
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

        Order::try_from(row)
    }

    /// Insert one order line, inside the checkout transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn add_line_tx(
        conn: &mut SqliteConnection,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Decimal,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO order_lines (order_id, product_id, quantity, unit_price) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(order_id.as_i64())
        .bind(product_id.as_i64())
        .bind(quantity)
        .bind(format!("{unit_price:.2}"))
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
