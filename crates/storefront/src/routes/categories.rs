//! Category route handlers: public category page and staff CRUD.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use clover_core::CategoryId;

use crate::db::{CategoryRepository, ProductQuery, ProductRepository, RepositoryError};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::CsrfToken;
use crate::routes::home::CategoryView;
use crate::routes::products::ProductView;
use crate::routes::redirect_with;
use crate::state::AppState;

// =============================================================================
// Query & Form Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Category create/update form data.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
    pub csrf_token: String,
}

/// Delete form data: just the anti-forgery token.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteForm {
    pub csrf_token: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Category page: the category plus its products.
#[derive(Template, WebTemplate)]
#[template(path = "categories/view.html")]
pub struct CategoryViewTemplate {
    pub category: CategoryView,
    pub products: Vec<ProductView>,
}

/// Category list page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/list.html")]
pub struct CategoryListTemplate {
    pub categories: Vec<CategoryView>,
    pub csrf_token: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Category create/update form template.
#[derive(Template, WebTemplate)]
#[template(path = "categories/form.html")]
pub struct CategoryFormTemplate {
    pub title: String,
    pub action: String,
    pub name: String,
    pub description: String,
    pub csrf_token: String,
    pub error: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display a category and the products in it.
#[instrument(skip(state))]
pub async fn view(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let category = CategoryRepository::new(state.pool())
        .get(CategoryId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;

    let filter = ProductQuery {
        category: Some(category.id),
        search: None,
    };
    let products = ProductRepository::new(state.pool()).list(&filter).await?;

    Ok(CategoryViewTemplate {
        category: CategoryView::from(&category),
        products: products.iter().map(ProductView::from).collect(),
    })
}

/// Display all categories.
#[instrument(skip(state, csrf))]
pub async fn list(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let categories = CategoryRepository::new(state.pool()).list().await?;

    Ok(CategoryListTemplate {
        categories: categories.iter().map(CategoryView::from).collect(),
        csrf_token: csrf,
        error: query.error,
        success: query.success,
    })
}

/// Display the empty category creation form.
#[instrument(skip(csrf))]
pub async fn create_form(CsrfToken(csrf): CsrfToken) -> impl IntoResponse {
    CategoryFormTemplate {
        title: "Create Category".to_owned(),
        action: "/category/create/".to_owned(),
        name: String::new(),
        description: String::new(),
        csrf_token: csrf,
        error: None,
    }
}

/// Handle category creation.
#[instrument(skip(state, csrf, form))]
pub async fn create(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let name = form.name.trim();
    let rerender = |error: String| CategoryFormTemplate {
        title: "Create Category".to_owned(),
        action: "/category/create/".to_owned(),
        name: form.name.clone(),
        description: form.description.clone(),
        csrf_token: csrf.clone(),
        error: Some(error),
    };

    if name.is_empty() {
        return Ok(rerender("Category name is required".to_owned()).into_response());
    }

    match CategoryRepository::new(state.pool())
        .create(name, form.description.trim())
        .await
    {
        Ok(category) => {
            tracing::info!(category_id = %category.id, "Category created");
            Ok(
                Redirect::to(&redirect_with("/categories/", "success", "Category created"))
                    .into_response(),
            )
        }
        Err(RepositoryError::Conflict(message)) => Ok(rerender(message).into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Display the category update form, pre-filled.
#[instrument(skip(state, csrf))]
pub async fn update_form(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    let category = CategoryRepository::new(state.pool())
        .get(CategoryId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;

    Ok(CategoryFormTemplate {
        title: "Update Category".to_owned(),
        action: format!("/category/{id}/update/"),
        name: category.name,
        description: category.description,
        csrf_token: csrf,
        error: None,
    })
}

/// Handle category update.
#[instrument(skip(state, csrf, form))]
pub async fn update(
    State(state): State<AppState>,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> Result<Response> {
    let name = form.name.trim();
    let rerender = |error: String| CategoryFormTemplate {
        title: "Update Category".to_owned(),
        action: format!("/category/{id}/update/"),
        name: form.name.clone(),
        description: form.description.clone(),
        csrf_token: csrf.clone(),
        error: Some(error),
    };

    if name.is_empty() {
        return Ok(rerender("Category name is required".to_owned()).into_response());
    }

    match CategoryRepository::new(state.pool())
        .update(CategoryId::new(id), name, form.description.trim())
        .await
    {
        Ok(()) => Ok(
            Redirect::to(&redirect_with("/categories/", "success", "Category updated"))
                .into_response(),
        ),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("category {id}"))),
        Err(RepositoryError::Conflict(message)) => Ok(rerender(message).into_response()),
        Err(other) => Err(other.into()),
    }
}

/// Handle category deletion. Products in the category are cascade-deleted.
#[instrument(skip(state, _form))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(_form): Form<DeleteForm>,
) -> Result<Redirect> {
    let deleted = CategoryRepository::new(state.pool())
        .delete(CategoryId::new(id))
        .await?;

    if !deleted {
        return Err(AppError::NotFound(format!("category {id}")));
    }

    Ok(Redirect::to(&redirect_with(
        "/categories/",
        "success",
        "Category deleted",
    )))
}
