//! Product route handlers: public catalog pages and staff CRUD.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use clover_core::{CategoryId, Price, ProductId};

use crate::db::{CategoryRepository, ProductQuery, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CsrfToken;
use crate::models::Product;
use crate::routes::home::CategoryView;
use crate::routes::{money, redirect_with};
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub price: String,
    pub description: String,
    pub stock: i64,
    pub category_id: Option<i64>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i64(),
            name: product.name.clone(),
            price: money(product.price),
            description: product.description.clone(),
            stock: product.stock,
            category_id: product.category_id.map(|id| id.as_i64()),
        }
    }
}

/// Raw form values echoed back into the product form on validation errors.
#[derive(Clone, Default)]
pub struct ProductFormValues {
    pub name: String,
    pub price: String,
    pub description: String,
    pub stock: String,
    pub category: String,
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: format!("{:.2}", product.price),
            description: product.description.clone(),
            stock: product.stock.to_string(),
            category: product
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }
}

// =============================================================================
// Query & Form Types
// =============================================================================

/// Product list query parameters.
#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Product create/update form data.
///
/// Numeric fields arrive as strings and are validated explicitly; a
/// non-numeric price or stock is a validation failure, never a silent
/// default.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductForm {
    pub name: String,
    pub price: String,
    pub description: String,
    pub stock: String,
    /// Category id as a string; empty means "no category".
    #[serde(default)]
    pub category: String,
    pub csrf_token: String,
}

/// The validated payload extracted from a [`ProductForm`].
struct ValidatedProduct {
    name: String,
    price: Price,
    description: String,
    stock: i64,
    category_id: Option<CategoryId>,
}

impl ProductForm {
    fn validate(&self) -> std::result::Result<ValidatedProduct, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Product name is required".to_owned());
        }

        let price =
            Price::parse(&self.price).map_err(|e| format!("Invalid price: {e}"))?;

        let stock: i64 = self
            .stock
            .trim()
            .parse()
            .map_err(|_| "Stock must be a whole number".to_owned())?;
        if stock < 0 {
            return Err("Stock cannot be negative".to_owned());
        }

        let category_id = if self.category.trim().is_empty() {
            None
        } else {
            let id: i64 = self
                .category
                .trim()
                .parse()
                .map_err(|_| "Invalid category".to_owned())?;
            Some(CategoryId::new(id))
        };

        Ok(ValidatedProduct {
            name: name.to_owned(),
            price,
            description: self.description.trim().to_owned(),
            stock,
            category_id,
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Product list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/list.html")]
pub struct ProductListTemplate {
    pub products: Vec<ProductView>,
    pub search: String,
    pub csrf_token: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/detail.html")]
pub struct ProductDetailTemplate {
    pub product: ProductView,
}

/// Product create/update form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub title: String,
    pub action: String,
    pub values: ProductFormValues,
    pub categories: Vec<CategoryView>,
    pub csrf_token: String,
    pub error: Option<String>,
}

// =============================================================================
// Public Catalog Handlers
// =============================================================================

/// Display the searchable product list.
#[instrument(skip(state, csrf))]
pub async fn list(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse> {
    let search = query.search.unwrap_or_default();
    let filter = ProductQuery {
        category: None,
        search: if search.trim().is_empty() {
            None
        } else {
            Some(search.trim().to_owned())
        },
    };

    let products = ProductRepository::new(state.pool()).list(&filter).await?;

    Ok(ProductListTemplate {
        products: products.iter().map(ProductView::from).collect(),
        search,
        csrf_token: csrf,
        error: query.error,
        success: query.success,
    })
}

/// Display a single product.
#[instrument(skip(state))]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductDetailTemplate {
        product: ProductView::from(&product),
    })
}

// =============================================================================
// Management Handlers
// =============================================================================

async fn form_template(
    state: &AppState,
    title: &str,
    action: &str,
    values: ProductFormValues,
    csrf: String,
    error: Option<String>,
) -> Result<ProductFormTemplate> {
    let categories = CategoryRepository::new(state.pool()).list().await?;

    Ok(ProductFormTemplate {
        title: title.to_owned(),
        action: action.to_owned(),
        values,
        categories: categories.iter().map(CategoryView::from).collect(),
        csrf_token: csrf,
        error,
    })
}

/// Display the empty product creation form.
#[instrument(skip(state, csrf))]
pub async fn create_form(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
) -> Result<impl IntoResponse> {
    form_template(
        &state,
        "Create Product",
        "/product/create/",
        ProductFormValues::default(),
        csrf,
        None,
    )
    .await
}

/// Handle product creation.
#[instrument(skip(state, csrf, form))]
pub async fn create(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let values = ProductFormValues {
        name: form.name.clone(),
        price: form.price.clone(),
        description: form.description.clone(),
        stock: form.stock.clone(),
        category: form.category.clone(),
    };

    let validated = match form.validate() {
        Ok(v) => v,
        Err(message) => {
            return Ok(form_template(
                &state,
                "Create Product",
                "/product/create/",
                values,
                csrf,
                Some(message),
            )
            .await?
            .into_response());
        }
    };

    let result = ProductRepository::new(state.pool())
        .create(
            &validated.name,
            validated.price.amount(),
            &validated.description,
            validated.stock,
            validated.category_id,
        )
        .await;

    match result {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product created");
            Ok(
                Redirect::to(&redirect_with("/products/", "success", "Product created"))
                    .into_response(),
            )
        }
        Err(RepositoryError::Conflict(message)) => Ok(form_template(
            &state,
            "Create Product",
            "/product/create/",
            values,
            csrf,
            Some(message),
        )
        .await?
        .into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Display the product update form, pre-filled.
#[instrument(skip(state, csrf))]
pub async fn update_form(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    form_template(
        &state,
        "Update Product",
        &format!("/product/{id}/update/"),
        ProductFormValues::from(&product),
        csrf,
        None,
    )
    .await
}

/// Handle product update.
#[instrument(skip(state, csrf, form))]
pub async fn update(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let action = format!("/product/{id}/update/");
    let values = ProductFormValues {
        name: form.name.clone(),
        price: form.price.clone(),
        description: form.description.clone(),
        stock: form.stock.clone(),
        category: form.category.clone(),
    };

    let validated = match form.validate() {
        Ok(v) => v,
        Err(message) => {
            return Ok(
                form_template(&state, "Update Product", &action, values, csrf, Some(message))
                    .await?
                    .into_response(),
            );
        }
    };

    let result = ProductRepository::new(state.pool())
        .update(
            ProductId::new(id),
            &validated.name,
            validated.price.amount(),
            &validated.description,
            validated.stock,
            validated.category_id,
        )
        .await;

    match result {
        Ok(()) => Ok(
            Redirect::to(&redirect_with("/products/", "success", "Product updated"))
                .into_response(),
        ),
        Err(RepositoryError::NotFound) => {
            Err(AppError::NotFound(format!("product {id}")))
        }
        Err(RepositoryError::Conflict(message)) => Ok(form_template(
            &state,
            "Update Product",
            &action,
            values,
            csrf,
            Some(message),
        )
        .await?
        .into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Delete form data: just the anti-forgery token.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteForm {
    pub csrf_token: String,
}

/// Handle product deletion.
#[instrument(skip(state, _form))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(_form): Form<DeleteForm>,
) -> Result<Redirect> {
    let deleted = ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;

    if !deleted {
        return Err(AppError::NotFound(format!("product {id}")));
    }

    Ok(Redirect::to(&redirect_with(
        "/products/",
        "success",
        "Product deleted",
    )))
}
