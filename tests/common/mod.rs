#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower::ServiceExt;

use notes_marketplace::{
    api::{create_router, AppState},
    config::Config,
    payments::StripeClient,
};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";
pub const STRIPE_KEY: &str = "sk_test_123";

pub fn test_config(stripe_api_base: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: "postgres://postgres@localhost/unused".to_string(),
        db_max_connections: 5,
        db_min_connections: 0,
        request_timeout_secs: 30,
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiry_hours: 24,
        stripe_secret_key: STRIPE_KEY.to_string(),
        stripe_publishable_key: "pk_test_123".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        stripe_api_base: stripe_api_base.to_string(),
        currency: "npr".to_string(),
        upload_dir: std::env::temp_dir()
            .join("notes-marketplace-test-uploads")
            .to_string_lossy()
            .into_owned(),
        max_upload_bytes: 10 * 1024 * 1024,
    }
}

pub fn test_state(db: PgPool, stripe_api_base: &str) -> AppState {
    let config = test_config(stripe_api_base);
    let stripe = StripeClient::new(&config.stripe_secret_key, &config.stripe_api_base).unwrap();

    AppState {
        db,
        stripe,
        config: Arc::new(config),
    }
}

/// Pool that never connects unless a handler actually queries it
pub fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy("postgres://postgres@127.0.0.1:1/unused")
        .unwrap()
}

pub fn test_router(db: PgPool, stripe_api_base: &str) -> Router {
    create_router(test_state(db, stripe_api_base))
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);

    (status, body)
}
