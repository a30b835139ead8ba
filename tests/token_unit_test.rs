//! Unit tests for bearer-token verification on the dashboard routes.
//!
//! A probe route sits behind the auth middleware; every case drives the full
//! router so header parsing, claim decoding, and principal injection are
//! covered together.
//!
//! Run with: cargo test --test token_unit_test

use axum::body::{to_bytes, Body};
use axum::extract::Extension;
use axum::http::{header, Request, StatusCode};
use axum::routing::get;
use axum::{middleware, Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{json, Value};
use tower::ServiceExt;

use envhub::auth::{require_principal, Claims, Principal};
use envhub::common::AppState;
use envhub::config::{Config, Deployment};

const SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        api_host: "127.0.0.1".to_string(),
        api_port: 0,
        mail_relay_url: None,
        mail_relay_token: None,
        mail_skip_tls_verify: false,
        mail_alert_window_hours: 5,
        disable_rate_limiting: true,
        rate_limit_api_per_second: 10,
        rate_limit_api_burst: 60,
        rate_limit_ingest_per_second: 5,
        rate_limit_ingest_burst: 30,
        export_concurrent_limit: 5,
        cache_ttl_seconds: 300,
        cache_max_entries: 100,
        deployment: Deployment::Local,
    }
}

/// Echoes the principal the middleware injected.
async fn whoami(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({
        "username": principal.username,
        "institute": principal.institute,
        "canMutateNodes": principal.can_mutate_nodes(),
    }))
}

fn app() -> Router {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let state = AppState::new(db, test_config(), None);

    Router::new()
        .route("/whoami", get(whoami))
        .layer(middleware::from_fn_with_state(state, require_principal))
}

fn claims(privilege: i32) -> Claims {
    Claims {
        username: "alice".to_string(),
        institute: "iiser-p".to_string(),
        privilege,
        exp: 4_102_444_800, // 2100-01-01
        iat: 1_700_000_000,
    }
}

fn token(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encoding is infallible for HS256")
}

async fn send(authorization: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri("/whoami");
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let request = builder.body(Body::empty()).unwrap();

    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let (status, body) = send(None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing Authorization header");
}

#[tokio::test]
async fn non_bearer_schemes_are_rejected() {
    let (status, body) = send(Some("Basic YWxpY2U6aHVudGVyMg==")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["error"],
        "Authorization header must use the Bearer scheme"
    );
}

#[tokio::test]
async fn empty_bearer_tokens_are_rejected() {
    let (status, body) = send(Some("Bearer ")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Empty bearer token");
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let (status, body) = send(Some("Bearer not.a.jwt")).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let message = body["error"].as_str().expect("error message present");
    assert!(message.starts_with("Invalid token"), "got: {message}");
}

#[tokio::test]
async fn wrong_secret_signatures_are_rejected() {
    let stolen = token(&claims(1), "a-different-secret");
    let (status, _) = send(Some(&format!("Bearer {stolen}"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let mut expired = claims(1);
    expired.exp = 1_000_000_000; // 2001, far past any validation leeway
    let stale = token(&expired, SECRET);

    let (status, _) = send(Some(&format!("Bearer {stale}"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn valid_tokens_resolve_the_principal() {
    let fresh = token(&claims(2), SECRET);
    let (status, body) = send(Some(&format!("Bearer {fresh}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["institute"], "iiser-p");
    assert_eq!(body["canMutateNodes"], true);
}

#[tokio::test]
async fn viewer_tokens_resolve_to_read_only_principals() {
    let fresh = token(&claims(3), SECRET);
    let (status, body) = send(Some(&format!("Bearer {fresh}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["canMutateNodes"], false);
}
