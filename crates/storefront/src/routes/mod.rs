//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                        - Catalog home, optional ?category= filter
//! GET  /health                  - Health check
//!
//! # Catalog
//! GET  /product/{id}/           - Product detail
//! GET  /category/{id}/          - Products in a category
//! GET  /products/               - Product list with ?search=
//!
//! # Catalog management
//! GET/POST /product/create/     - Create product
//! GET/POST /product/{id}/update/ - Update product
//! POST /product/{id}/delete/    - Delete product
//! GET  /categories/             - Category list
//! GET/POST /category/create/    - Create category
//! GET/POST /category/{id}/update/ - Update category
//! POST /category/{id}/delete/   - Delete category
//!
//! # User management
//! GET  /users/                  - User list
//! GET  /user/{id}/              - User detail with customer profile
//! GET/POST /user/create/        - Create user + profile
//! GET/POST /user/{id}/update/   - Update user + profile
//! POST /user/{id}/delete/       - Delete user
//!
//! # Cart (session-backed)
//! GET  /cart/                   - View cart
//! GET  /add-to-cart/{id}/       - Add a line, ?quantity= (default 1)
//! GET  /remove-from-cart/{id}/  - Remove a line (idempotent)
//!
//! # Checkout & orders
//! GET/POST /checkout/           - Place order (requires auth)
//! GET  /order-confirmation/{order_id}/ - Receipt
//! GET  /my-orders/              - Customer's order history (requires auth)
//!
//! # Order management
//! GET  /orders/                 - Order list with ?status= filter
//! GET  /order/{id}/             - Order detail
//! GET/POST /order/{id}/update/  - Status transition
//!
//! # Auth
//! GET/POST /register/           - Registration
//! GET/POST /login/              - Login
//! POST /logout/                 - Logout
//! ```
//!
//! Every mutating POST carries the session's anti-forgery token; the CSRF
//! middleware rejects the request before any handler runs otherwise.

pub mod auth;
pub mod cart;
pub mod categories;
pub mod checkout;
pub mod home;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};
use rust_decimal::Decimal;

use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/product/{id}/", get(products::detail))
        .route("/category/{id}/", get(categories::view))
        .route("/products/", get(products::list))
}

/// Create the catalog-management routes router.
pub fn catalog_management_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/product/create/",
            get(products::create_form).post(products::create),
        )
        .route(
            "/product/{id}/update/",
            get(products::update_form).post(products::update),
        )
        .route("/product/{id}/delete/", post(products::delete))
        .route("/categories/", get(categories::list))
        .route(
            "/category/create/",
            get(categories::create_form).post(categories::create),
        )
        .route(
            "/category/{id}/update/",
            get(categories::update_form).post(categories::update),
        )
        .route("/category/{id}/delete/", post(categories::delete))
}

/// Create the user-management routes router.
pub fn user_management_routes() -> Router<AppState> {
    Router::new()
        .route("/users/", get(users::list))
        .route("/user/{id}/", get(users::detail))
        .route("/user/create/", get(users::create_form).post(users::create))
        .route(
            "/user/{id}/update/",
            get(users::update_form).post(users::update),
        )
        .route("/user/{id}/delete/", post(users::delete))
}

/// Create the cart and checkout routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart/", get(cart::view))
        .route("/add-to-cart/{id}/", get(cart::add))
        .route("/remove-from-cart/{id}/", get(cart::remove))
        .route(
            "/checkout/",
            get(checkout::form).post(checkout::place_order),
        )
        .route(
            "/order-confirmation/{order_id}/",
            get(checkout::confirmation),
        )
        .route("/my-orders/", get(orders::my_orders))
}

/// Create the order-management routes router.
pub fn order_management_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/", get(orders::list))
        .route("/order/{id}/", get(orders::detail))
        .route(
            "/order/{id}/update/",
            get(orders::update_form).post(orders::update),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register/", get(auth::register_page).post(auth::register))
        .route("/login/", get(auth::login_page).post(auth::login))
        .route("/logout/", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .merge(catalog_management_routes())
        .merge(user_management_routes())
        .merge(cart_routes())
        .merge(order_management_routes())
        .merge(auth_routes())
}

/// Format a decimal amount as a display price (e.g. "$19.99").
pub(crate) fn money(amount: Decimal) -> String {
    format!("${amount:.2}")
}

/// Build a redirect target carrying a user-visible message.
pub(crate) fn redirect_with(path: &str, param: &str, message: &str) -> String {
    format!("{path}?{param}={}", urlencoding::encode(message))
}
