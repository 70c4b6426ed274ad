//! HTTP-level tests for the anti-forgery guard: a POST without the
//! session's token never reaches its handler.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::get,
};
use tower::ServiceExt;
use tower_sessions::SessionManagerLayer;
use tower_sessions_sqlx_store::SqliteStore;

use clover_integration_tests::test_pool;
use clover_storefront::middleware::{CsrfToken, csrf_protect};

/// A tiny app with one page that issues the token and one mutating POST,
/// wrapped in the real session + CSRF layers.
async fn app() -> Router {
    let pool = test_pool().await;
    let store = SqliteStore::new(pool);
    store.migrate().await.unwrap();

    Router::new()
        .route(
            "/form",
            get(|CsrfToken(token): CsrfToken| async move { token }).post(|| async { "changed" }),
        )
        .layer(axum::middleware::from_fn(csrf_protect))
        .layer(SessionManagerLayer::new(store))
}

#[tokio::test]
async fn post_without_any_session_is_forbidden() {
    let app = app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("csrf_token=forged"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_with_wrong_token_is_forbidden() {
    let app = app().await;

    // Fetch the form page to get a session cookie and a real token.
    let response = app
        .clone()
        .oneshot(Request::builder().uri("/form").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("issuing a token must set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("csrf_token=notTheRealToken"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_with_matching_token_reaches_the_handler() {
    let app = app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/form").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("issuing a token must set the session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_owned();

    let token_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let token = String::from_utf8(token_bytes.to_vec()).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(header::COOKIE, &cookie)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("csrf_token={token}")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"changed");
}

#[tokio::test]
async fn get_requests_pass_through_untouched() {
    let app = app().await;

    let response = app
        .oneshot(Request::builder().uri("/form").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
