//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. Route handlers return `Result<T, AppError>`
//! and let `?` funnel layer errors here; expected domain failures (wrong
//! password, empty cart, conflicts) are usually turned into redirects with a
//! message instead of surfacing as bare status pages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order placement failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request refused (anti-forgery failure and the like).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is a server-side fault worth capturing.
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Internal(_) => true,
            Self::Database(err) => matches!(
                err,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ),
            Self::Auth(err) => matches!(
                err,
                AuthError::Repository(_) | AuthError::PasswordHash
            ),
            Self::Checkout(err) => matches!(err, CheckoutError::Repository(_)),
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::PasswordMismatch
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidUsername(_) => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => StatusCode::BAD_REQUEST,
                CheckoutError::ProductMissing { .. } => StatusCode::NOT_FOUND,
                CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            match &self {
                Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                    "Invalid username or password".to_string()
                }
                Self::Auth(AuthError::UserAlreadyExists) => "Username already exists".to_string(),
                other => other.to_string(),
            }
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            let response = err.into_response();
            response.status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        let conflict = AppError::Database(RepositoryError::Conflict("name taken".into()));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let empty = AppError::Checkout(CheckoutError::EmptyCart);
        assert_eq!(empty.into_response().status(), StatusCode::BAD_REQUEST);

        let stock = AppError::Checkout(CheckoutError::InsufficientStock {
            product_id: clover_core::ProductId::new(1),
            name: "Teapot".into(),
            requested: 2,
            available: 1,
        });
        assert_eq!(stock.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
