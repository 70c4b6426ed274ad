//! Cart route handlers.
//!
//! The cart lives in the session as a single serialized value. Handlers load
//! it through an explicit session handle, mutate the pure [`Cart`] type, and
//! write it back; stock is deliberately not consulted here - it is checked
//! and decremented only inside the checkout transaction.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use clover_core::ProductId;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::models::{Cart, session_keys};
use crate::routes::{money, redirect_with};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Load the cart from the session, defaulting to an empty cart.
pub(crate) async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Write the cart back to the session.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store fails.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session
        .insert(session_keys::CART, cart)
        .await
        .map_err(|e| AppError::Internal(format!("failed to persist session cart: {e}")))
}

// =============================================================================
// Query Types
// =============================================================================

/// Add-to-cart query parameters.
#[derive(Debug, Deserialize)]
pub struct AddToCartQuery {
    /// Requested quantity; defaults to 1 when absent. Non-numeric input is a
    /// validation failure, not a silent default.
    pub quantity: Option<String>,
}

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: i64,
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub is_empty: bool,
    pub error: Option<String>,
    pub success: Option<String>,
}

impl CartTemplate {
    fn from_cart(cart: &Cart, error: Option<String>, success: Option<String>) -> Self {
        let lines: Vec<CartLineView> = cart
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

        Self {
            total: money(cart.total()),
            is_empty: lines.is_empty(),
            lines,
            error,
            success,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart. Read-only; totals are recomputed on every call.
#[instrument(skip(session))]
pub async fn view(session: Session, Query(query): Query<MessageQuery>) -> impl IntoResponse {
    let cart = load_cart(&session).await;
    CartTemplate::from_cart(&cart, query.error, query.success)
}

/// Add a product to the cart.
///
/// Looks the product up (404 when absent), then inserts a new line capturing
/// the current name and price, or increments the existing line's quantity.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i64>,
    Query(query): Query<AddToCartQuery>,
) -> Result<Redirect> {
    let quantity: u32 = match query.quantity.as_deref() {
        None | Some("") => 1,
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::BadRequest(format!("invalid quantity: {raw}")))?,
    };
    if quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_owned()));
    }

    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut cart = load_cart(&session).await;
    cart.add(product.id, &product.name, product.price, quantity);
    save_cart(&session, &cart).await?;

    Ok(Redirect::to(&redirect_with(
        "/cart/",
        "success",
        &format!("{} added to cart", product.name),
    )))
}

/// Remove a product from the cart. Removing an absent product succeeds
/// silently.
#[instrument(skip(session))]
pub async fn remove(session: Session, Path(id): Path<i64>) -> Result<Redirect> {
    let mut cart = load_cart(&session).await;
    cart.remove(ProductId::new(id));
    save_cart(&session, &cart).await?;

    Ok(Redirect::to("/cart/"))
}
