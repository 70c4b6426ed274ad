//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use clover_core::{CustomerId, OrderId, OrderStatus, ProductId};

/// A durable record of a completed checkout.
///
/// `total_amount` is the snapshot computed at checkout time from the cart's
/// unit-price snapshots; it is never recomputed, even if catalog prices
/// change later.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of an order: a product, the quantity bought, and the unit price
/// paid at checkout time.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: ProductId,
    /// Current catalog name of the product, joined in for display.
    pub product_name: String,
    pub quantity: i64,
    /// Unit price snapshot from the cart at checkout time.
    pub unit_price: Decimal,
}

impl OrderLine {
    /// quantity x unit price, in decimal space.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}
