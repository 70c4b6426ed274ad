//! Order route handlers: customer history and staff order management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use clover_core::{OrderId, OrderStatus};

use crate::db::{CustomerRepository, OrderFilter, OrderRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, RequireAuth};
use crate::models::{Order, OrderLine};
use crate::routes::redirect_with;
use crate::routes::money;
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i64,
    pub total: String,
    pub status: String,
    pub status_label: String,
    pub created_at: String,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i64(),
            total: money(order.total_amount),
            status: order.status.to_string(),
            status_label: order.status.label().to_owned(),
            created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderLineView {
    pub name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: money(line.unit_price),
            line_total: money(line.line_total()),
        }
    }
}

/// A status option for filter dropdowns and the transition form.
#[derive(Clone)]
pub struct StatusOption {
    pub value: String,
    pub label: String,
}

fn status_option(status: OrderStatus) -> StatusOption {
    StatusOption {
        value: status.to_string(),
        label: status.label().to_owned(),
    }
}

// =============================================================================
// Query & Form Types
// =============================================================================

/// Order list query parameters.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    /// Exact status filter; anything outside the enumerated set is rejected.
    pub status: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Status transition form data.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderUpdateForm {
    pub status: String,
    pub csrf_token: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Customer order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/my_orders.html")]
pub struct MyOrdersTemplate {
    pub orders: Vec<OrderView>,
}

/// Staff order list template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrderListTemplate {
    pub orders: Vec<OrderView>,
    pub statuses: Vec<StatusOption>,
    pub status_filter: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Staff order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/detail.html")]
pub struct OrderDetailTemplate {
    pub order: OrderView,
    pub lines: Vec<OrderLineView>,
}

/// Status transition form template.
///
/// Only the transitions that are legal from the order's current status are
/// offered.
#[derive(Template, WebTemplate)]
#[template(path = "orders/form.html")]
pub struct OrderFormTemplate {
    pub order: OrderView,
    pub transitions: Vec<StatusOption>,
    pub csrf_token: String,
    pub error: Option<String>,
}

// =============================================================================
// Customer Handlers
// =============================================================================

/// Display the authenticated customer's order history, newest first.
#[instrument(skip(state, user))]
pub async fn my_orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<impl IntoResponse> {
    let customer = CustomerRepository::new(state.pool())
        .get_by_user(user.id)
        .await?;

    let orders = match customer {
        Some(customer) => {
            OrderRepository::new(state.pool())
                .list_for_customer(customer.id)
                .await?
        }
        // No profile yet means no orders either.
        None => Vec::new(),
    };

    Ok(MyOrdersTemplate {
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

// =============================================================================
// Management Handlers
// =============================================================================

/// Display all orders, newest first, optionally filtered by exact status.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<OrderStatus>()
                .map_err(AppError::BadRequest)?,
        ),
    };

    let orders = OrderRepository::new(state.pool())
        .list(OrderFilter { status })
        .await?;

    Ok(OrderListTemplate {
        orders: orders.iter().map(OrderView::from).collect(),
        statuses: OrderStatus::ALL.into_iter().map(status_option).collect(),
        status_filter: status.map(|s| s.to_string()).unwrap_or_default(),
        error: query.error,
        success: query.success,
    })
}

/// Display a single order with its lines.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool());

    let order = orders
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let lines = orders.lines(order.id).await?;

    Ok(OrderDetailTemplate {
        order: OrderView::from(&order),
        lines: lines.iter().map(OrderLineView::from).collect(),
    })
}

fn legal_transitions(from: OrderStatus) -> Vec<StatusOption> {
    OrderStatus::ALL
        .into_iter()
        .filter(|next| from.can_transition_to(*next))
        .map(status_option)
        .collect()
}

/// Display the status transition form.
#[instrument(skip(state, csrf))]
pub async fn update_form(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let order = OrderRepository::new(state.pool())
        .get(OrderId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    Ok(OrderFormTemplate {
        transitions: legal_transitions(order.status),
        order: OrderView::from(&order),
        csrf_token: csrf,
        error: None,
    })
}

/// Apply a status transition.
#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<OrderUpdateForm>,
) -> Result<Response> {
    let next = form
        .status
        .parse::<OrderStatus>()
        .map_err(AppError::BadRequest)?;

    match OrderRepository::new(state.pool())
        .update_status(OrderId::new(id), next)
        .await
    {
        Ok(order) => {
            tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
            Ok(Redirect::to(&redirect_with(
                "/orders/",
                "success",
                &format!("Order #{} updated to {}", order.id, order.status.label()),
            ))
            .into_response())
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("order {id}"))),
        Err(err @ RepositoryError::InvalidTransition { .. }) => Ok(Redirect::to(
            &redirect_with("/orders/", "error", &err.to_string()),
        )
        .into_response()),
        Err(other) => Err(other.into()),
    }
}
