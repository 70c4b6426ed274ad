//! Catalog home page handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use clover_core::CategoryId;

use crate::db::{CategoryRepository, ProductQuery, ProductRepository};
use crate::error::Result;
use crate::filters;
use crate::middleware::{CsrfToken, OptionalAuth};
use crate::models::CurrentUser;
use crate::routes::products::ProductView;
use crate::state::AppState;

/// Category display data for templates.
#[derive(Clone)]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub description: String,
}

impl From<&crate::models::Category> for CategoryView {
    fn from(category: &crate::models::Category) -> Self {
        Self {
            id: category.id.as_i64(),
            name: category.name.clone(),
            description: category.description.clone(),
        }
    }
}

/// Home page query parameters.
#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    /// Optional category filter.
    pub category: Option<i64>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub products: Vec<ProductView>,
    pub categories: Vec<CategoryView>,
    pub user: Option<CurrentUser>,
    pub csrf_token: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Display the catalog home page, optionally filtered by category.
#[instrument(skip(state, user, csrf))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<HomeQuery>,
) -> Result<impl IntoResponse> {
    let filter = ProductQuery {
        category: query.category.map(CategoryId::new),
        search: None,
    };

    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    let categories = CategoryRepository::new(state.pool()).list().await?;

    Ok(HomeTemplate {
        products: products.iter().map(ProductView::from).collect(),
        categories: categories.iter().map(CategoryView::from).collect(),
        user,
        csrf_token: csrf,
        error: query.error,
        success: query.success,
    })
}
