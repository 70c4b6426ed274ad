//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with SQLite store)
//! 4. CSRF guard (validate the anti-forgery token on every POST)

pub mod auth;
pub mod csrf;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use csrf::{CsrfToken, csrf_protect};
pub use session::create_session_layer;
