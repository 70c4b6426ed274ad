//! Authentication route handlers.
//!
//! Login, registration and logout. Outcomes travel as `?error=`/`?success=`
//! query messages on redirects, so a failed login never re-posts the form.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CsrfToken, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::routes::redirect_with;
use crate::services::auth::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub csrf_token: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub csrf_token: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
    pub csrf_token: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
    pub csrf_token: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    LoginTemplate {
        error: query.error,
        success: query.success,
        csrf_token: csrf,
    }
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => {
            let current_user = CurrentUser {
                id: user.id,
                username: user.username.clone(),
            };

            if let Err(e) = set_current_user(&session, &current_user).await {
                tracing::error!("Failed to set session: {e}");
                return Redirect::to(&redirect_with(
                    "/login/",
                    "error",
                    "Session error, please try again",
                ))
                .into_response();
            }

            set_sentry_user(&user.id, Some(&user.username));
            tracing::info!(user_id = %user.id, "User logged in");

            Redirect::to("/").into_response()
        }
        Err(AuthError::Repository(err)) => {
            tracing::error!("Login failed with database error: {err}");
            Redirect::to(&redirect_with(
                "/login/",
                "error",
                "Something went wrong, please try again",
            ))
            .into_response()
        }
        Err(e) => {
            tracing::warn!("Login failed: {e}");
            Redirect::to(&redirect_with(
                "/login/",
                "error",
                "Invalid username or password",
            ))
            .into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    RegisterTemplate {
        error: query.error,
        csrf_token: csrf,
    }
}

/// Handle registration form submission.
#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    match AuthService::new(state.pool())
        .register(
            &form.username,
            &form.email,
            &form.password,
            &form.confirm_password,
        )
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "User registered");
            Redirect::to(&redirect_with(
                "/login/",
                "success",
                "Account created successfully! Please login.",
            ))
            .into_response()
        }
        Err(AuthError::Repository(err)) => {
            tracing::error!("Registration failed with database error: {err}");
            Redirect::to(&redirect_with(
                "/register/",
                "error",
                "Something went wrong, please try again",
            ))
            .into_response()
        }
        Err(e) => {
            tracing::warn!("Registration rejected: {e}");
            Redirect::to(&redirect_with("/register/", "error", &e.to_string())).into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout: clear the user and destroy the whole session (cart
/// included).
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Response {
    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session user: {e}");
    }

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {e}");
    }

    clear_sentry_user();

    Redirect::to("/").into_response()
}
