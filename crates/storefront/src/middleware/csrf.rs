//! Anti-forgery (CSRF) protection.
//!
//! A random token is bound to each session and embedded into every mutating
//! form. The [`csrf_protect`] middleware rejects any POST whose body does
//! not carry the session's token - before the request reaches a handler, so
//! no data-model read or write happens for a forged request.

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Request},
    http::{Method, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::{Rng, distr::Alphanumeric};
use tower_sessions::Session;

use crate::models::session_keys;

/// Form field carrying the token.
pub const TOKEN_FIELD: &str = "csrf_token";

/// Token length in characters.
const TOKEN_LENGTH: usize = 32;

/// Largest request body the guard will buffer (matches axum's form limit).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Extractor providing the session's anti-forgery token.
///
/// Generates and stores a fresh token on first use, so any page that renders
/// a form can simply take this extractor and interpolate the token.
pub struct CsrfToken(pub String);

impl<S> FromRequestParts<S> for CsrfToken
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

        if let Ok(Some(token)) = session.get::<String>(session_keys::CSRF_TOKEN).await {
            return Ok(Self(token));
        }

        let token = generate_token();
        session
            .insert(session_keys::CSRF_TOKEN, &token)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        Ok(Self(token))
    }
}

/// Middleware validating the anti-forgery token on every POST.
///
/// Non-POST requests pass through untouched. For POSTs the body is buffered,
/// the `csrf_token` form field is compared against the session's token, and
/// the request is rebuilt for the handler only when they match.
pub async fn csrf_protect(request: Request, next: Next) -> Response {
    if request.method() != Method::POST {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return forbidden();
    };

    let Ok(Some(expected)) = session.get::<String>(session_keys::CSRF_TOKEN).await else {
        // No token has ever been issued to this session; nothing could have
        // rendered a legitimate form for it.
        return forbidden();
    };

    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_BYTES).await else {
        return forbidden();
    };

    match extract_token(&bytes) {
        Some(submitted) if submitted == expected => {
            let request = Request::from_parts(parts, Body::from(bytes));
            next.run(request).await
        }
        _ => forbidden(),
    }
}

fn forbidden() -> Response {
    (StatusCode::FORBIDDEN, "Invalid anti-forgery token").into_response()
}

/// Generate a fresh random token.
fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Pull the `csrf_token` field out of a urlencoded form body.
fn extract_token(body: &[u8]) -> Option<String> {
    let body = std::str::from_utf8(body).ok()?;
    body.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key != TOKEN_FIELD {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_extract_token_from_form_body() {
        let body = b"name=Teapot&csrf_token=abc123XYZ&price=19.99";
        assert_eq!(extract_token(body).unwrap(), "abc123XYZ");
    }

    #[test]
    fn test_extract_token_missing() {
        assert!(extract_token(b"name=Teapot&price=19.99").is_none());
        assert!(extract_token(b"").is_none());
    }

    #[test]
    fn test_extract_token_decodes_percent_encoding() {
        let body = b"csrf_token=abc%31%32%33";
        assert_eq!(extract_token(body).unwrap(), "abc123");
    }
}
