//! Catalog domain types.

use rust_decimal::Decimal;

use clover_core::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    /// Unique, non-empty display name.
    pub name: String,
    pub description: String,
}

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    /// Unique, non-empty display name.
    pub name: String,
    /// Unit price, two decimal places.
    pub price: Decimal,
    pub description: String,
    /// Units remaining. Never negative; decremented only at checkout.
    pub stock: i64,
    /// Owning category, if any. Category deletion cascades to products.
    pub category_id: Option<CategoryId>,
}
