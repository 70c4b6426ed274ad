//! Checkout / order-placement workflow.
//!
//! Converts a session cart into a durable order while keeping catalog stock
//! consistent. All writes - customer upsert, address update, order insert,
//! order lines, stock decrements - happen inside one transaction; any
//! failure rolls the whole thing back, leaving no partial order and no
//! partial stock mutation. The caller clears the cart only after a
//! successful return.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use thiserror::Error;

use clover_core::{ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::customers::CustomerRepository;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::models::{Cart, Customer, Order};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The cart has no lines; nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// A product in the cart no longer exists in the catalog.
    #[error("product {product_id} is no longer available")]
    ProductMissing {
        product_id: ProductId,
    },

    /// Not enough stock to satisfy a cart line.
    #[error("insufficient stock for \"{name}\": requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i64,
        available: i64,
    },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Address fields submitted with the checkout form.
///
/// Every field is optional: only fields that arrive non-empty overwrite the
/// stored profile value, so a form that omits (or leaves blank) a field
/// keeps whatever the customer saved before.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ShippingForm {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl ShippingForm {
    /// Merge the submitted fields into a customer profile.
    pub fn apply_to(&self, customer: &mut Customer) {
        apply_field(&self.phone, &mut customer.phone);
        apply_field(&self.address, &mut customer.address);
        apply_field(&self.city, &mut customer.city);
        apply_field(&self.state, &mut customer.state);
        apply_field(&self.postal_code, &mut customer.postal_code);
        apply_field(&self.country, &mut customer.country);
    }
}

fn apply_field(submitted: &Option<String>, current: &mut String) {
    if let Some(value) = submitted {
        let value = value.trim();
        if !value.is_empty() {
            *current = value.to_owned();
        }
    }
}

/// The order-placement workflow.
pub struct CheckoutService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Place an order for the authenticated user from their session cart.
    ///
    /// Steps, all inside one transaction:
    /// 1. find-or-create the customer profile for the user;
    /// 2. merge submitted address fields into the profile and persist it;
    /// 3. total = sum of (unit-price snapshot x quantity) over cart lines;
    /// 4. insert the order as `pending` with that total;
    /// 5. per cart line: insert the order line, then conditionally decrement
    ///    the product's stock (`stock >= quantity` guard);
    /// 6. commit.
    ///
    /// The cart itself is not touched here; the caller clears it from the
    /// session only after this returns `Ok`, so a failed checkout leaves the
    /// cart intact for retry.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` without touching the database when
    /// the cart has no lines; `ProductMissing` / `InsufficientStock` roll
    /// back every write made so far.
    pub async fn place_order(
        &self,
        user_id: UserId,
        cart: &Cart,
        shipping: &ShippingForm,
    ) -> Result<Order, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let mut customer = CustomerRepository::find_or_create_tx(&mut tx, user_id).await?;
        shipping.apply_to(&mut customer);
        CustomerRepository::update_tx(&mut tx, &customer).await?;

        let total: Decimal = cart.total();
        let order = OrderRepository::create_tx(&mut tx, customer.id, total).await?;

        for line in cart.lines() {
            let quantity = i64::from(line.quantity);

            let available = ProductRepository::stock_tx(&mut tx, line.product_id)
                .await?
                .ok_or(CheckoutError::ProductMissing {
                    product_id: line.product_id,
                })?;

            if available < quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    requested: quantity,
                    available,
                });
            }

            OrderRepository::add_line_tx(&mut tx, order.id, line.product_id, quantity, line.unit_price)
                .await?;

            // The guard repeats inside the UPDATE so a decrement that lost a
            // race between the read above and this write still cannot push
            // stock below zero.
            let decremented =
                ProductRepository::decrement_stock_tx(&mut tx, line.product_id, quantity).await?;
            if !decremented {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    requested: quantity,
                    available,
                });
            }
        }

        tx.commit().await.map_err(RepositoryError::from)?;

        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use clover_core::{CustomerId, UserId};

    use super::*;

    fn customer() -> Customer {
        Customer {
            id: CustomerId::new(1),
            user_id: UserId::new(1),
            phone: "555-0100".into(),
            address: "1 Old Lane".into(),
            city: "Springfield".into(),
            state: "".into(),
            postal_code: "12345".into(),
            country: "US".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_submitted_fields_overwrite() {
        let mut c = customer();
        let form = ShippingForm {
            address: Some("2 New Street".into()),
            city: Some("Shelbyville".into()),
            ..ShippingForm::default()
        };

        form.apply_to(&mut c);

        assert_eq!(c.address, "2 New Street");
        assert_eq!(c.city, "Shelbyville");
    }

    #[test]
    fn test_absent_and_blank_fields_retain_prior_values() {
        let mut c = customer();
        let form = ShippingForm {
            phone: None,
            address: Some(String::new()),
            postal_code: Some("   ".into()),
            ..ShippingForm::default()
        };

        form.apply_to(&mut c);

        assert_eq!(c.phone, "555-0100");
        assert_eq!(c.address, "1 Old Lane");
        assert_eq!(c.postal_code, "12345");
    }

    #[test]
    fn test_values_are_trimmed() {
        let mut c = customer();
        let form = ShippingForm {
            country: Some("  Canada  ".into()),
            ..ShippingForm::default()
        };

        form.apply_to(&mut c);

        assert_eq!(c.country, "Canada");
    }
}
