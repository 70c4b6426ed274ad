//! The session-held shopping cart.
//!
//! A [`Cart`] is an ephemeral mapping from product id to a small snapshot of
//! the product (name, unit price at add time, quantity). It is serialized as
//! a single session value; handlers load it, mutate it, and write it back
//! through an explicit session handle. Nothing here touches the database —
//! stock is checked only at checkout.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clover_core::ProductId;

/// One cart entry: the purchase intent for a single product.
///
/// The unit price is captured as a decimal string at add time and is not
/// refreshed if the catalog price changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Product name snapshot.
    pub name: String,
    /// Unit price snapshot as a decimal string (e.g. "19.99").
    pub unit_price: String,
    /// Number of units, always >= 1.
    pub quantity: u32,
}

/// A computed view of one cart entry, with the line total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// The per-session cart: product id -> entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    entries: BTreeMap<i64, CartEntry>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// If the product is already present its quantity is incremented and the
    /// stored snapshots are left untouched; otherwise a new entry is inserted
    /// capturing the current name and unit price.
    pub fn add(&mut self, product_id: ProductId, name: &str, unit_price: Decimal, quantity: u32) {
        self.entries
            .entry(product_id.as_i64())
            .and_modify(|entry| entry.quantity = entry.quantity.saturating_add(quantity))
            .or_insert_with(|| CartEntry {
                name: name.to_owned(),
                unit_price: format!("{unit_price:.2}"),
                quantity,
            });
    }

    /// Remove a product. Removing an absent product is a silent no-op.
    pub fn remove(&mut self, product_id: ProductId) {
        self.entries.remove(&product_id.as_i64());
    }

    /// Drop all entries. Called as the last step of a successful checkout.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The stored entry for a product, if present.
    #[must_use]
    pub fn entry(&self, product_id: ProductId) -> Option<&CartEntry> {
        self.entries.get(&product_id.as_i64())
    }

    /// Computed lines with per-line totals. Recomputed on every call.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.entries
            .iter()
            .map(|(&id, entry)| {
                let unit_price = Decimal::from_str(&entry.unit_price).unwrap_or_default();
                CartLine {
                    product_id: ProductId::new(id),
                    name: entry.name.clone(),
                    unit_price,
                    quantity: entry.quantity,
                    line_total: unit_price * Decimal::from(entry.quantity),
                }
            })
            .collect()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.lines().iter().map(|line| line.line_total).sum()
    }
}
