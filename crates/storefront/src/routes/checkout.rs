//! Checkout route handlers.
//!
//! The GET handler renders the address form over the current cart; the POST
//! handler drives [`CheckoutService`] and turns its typed result into a
//! navigation outcome. The cart is cleared from the session only after the
//! service commits, so every failure leaves the cart intact for retry.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use clover_core::OrderId;

use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, RequireAuth};
use crate::models::Customer;
use crate::routes::cart::{CartLineView, load_cart, save_cart};
use crate::routes::orders::{OrderLineView, OrderView};
use crate::routes::{money, redirect_with};
use crate::services::checkout::{CheckoutError, CheckoutService, ShippingForm};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Checkout form data: the shipping fields plus the anti-forgery token.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutForm {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub csrf_token: String,
}

impl From<CheckoutForm> for ShippingForm {
    fn from(form: CheckoutForm) -> Self {
        Self {
            phone: form.phone,
            address: form.address,
            city: form.city,
            state: form.state,
            postal_code: form.postal_code,
            country: form.country,
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Customer profile values pre-filling the checkout form.
#[derive(Clone, Default)]
pub struct CustomerFormView {
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&Customer> for CustomerFormView {
    fn from(customer: &Customer) -> Self {
        Self {
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            city: customer.city.clone(),
            state: customer.state.clone(),
            postal_code: customer.postal_code.clone(),
            country: customer.country.clone(),
        }
    }
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub customer: CustomerFormView,
    pub csrf_token: String,
    pub error: Option<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "order_confirmation.html")]
pub struct OrderConfirmationTemplate {
    pub order: OrderView,
    pub lines: Vec<OrderLineView>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the checkout form. Requires auth; rejects an empty cart.
#[instrument(skip(state, session, user, csrf))]
pub async fn form(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: tower_sessions::Session,
    CsrfToken(csrf): CsrfToken,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    if cart.is_empty() {
        return Ok(
            Redirect::to(&redirect_with("/", "error", "Your cart is empty")).into_response(),
        );
    }

    // Pre-fill the form from the existing profile, if any.
    let customer = CustomerRepository::new(state.pool())
        .get_by_user(user.id)
        .await?;

    let lines = cart
        .lines()
        .iter()
        .map(|line| CartLineView {
            id: line.product_id.as_i64(),
            name: line.name.clone(),
            unit_price: money(line.unit_price),
            quantity: line.quantity,
            line_total: money(line.line_total),
        })
        .collect();

    Ok(CheckoutTemplate {
        lines,
        total: money(cart.total()),
        customer: customer
            .as_ref()
            .map(CustomerFormView::from)
            .unwrap_or_default(),
        csrf_token: csrf,
        error: None,
    }
    .into_response())
}

/// Place the order.
#[instrument(skip(state, session, user, form))]
pub async fn place_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: tower_sessions::Session,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let cart = load_cart(&session).await;
    let shipping = ShippingForm::from(form);

    let result = CheckoutService::new(state.pool())
        .place_order(user.id, &cart, &shipping)
        .await;

    match result {
        Ok(order) => {
            // The order is durable; only now does the cart go away.
            let mut cleared = cart;
            cleared.clear();
            save_cart(&session, &cleared).await?;

            tracing::info!(order_id = %order.id, total = %order.total_amount, "Order placed");
            Ok(Redirect::to(&format!("/order-confirmation/{}/", order.id)).into_response())
        }
        Err(CheckoutError::EmptyCart) => Ok(
            Redirect::to(&redirect_with("/", "error", "Your cart is empty")).into_response(),
        ),
        Err(err @ (CheckoutError::InsufficientStock { .. } | CheckoutError::ProductMissing { .. })) => {
            tracing::warn!(user_id = %user.id, error = %err, "Checkout rejected");
            Ok(Redirect::to(&redirect_with("/cart/", "error", &err.to_string())).into_response())
        }
        Err(CheckoutError::Repository(err)) => Err(err.into()),
    }
}

/// Display the order confirmation (receipt) page.
#[instrument(skip(state))]
pub async fn confirmation(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool());

    let order = orders
        .get(OrderId::new(order_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;
    let lines = orders.lines(order.id).await?;

    Ok(OrderConfirmationTemplate {
        order: OrderView::from(&order),
        lines: lines.iter().map(OrderLineView::from).collect(),
    })
}
