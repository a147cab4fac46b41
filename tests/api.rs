//! Router-level tests for paths that answer before touching the database.

mod common;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    Extension,
};
use serde_json::json;

use common::{json_request, lazy_pool, send, test_router, test_state, JWT_SECRET, WEBHOOK_SECRET};
use notes_marketplace::{
    api::{payments, AppJson, AuthUser},
    crypto::{issue_token, signature::sign_payload},
    error::AppError,
};

const NO_STRIPE: &str = "http://127.0.0.1:1";

#[tokio::test]
async fn health_reports_version() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        Request::get("/api/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn signup_lists_exactly_the_missing_fields() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            None,
            json!({
                "email": "a@gmail.com",
                "full_name": "A B",
                "phone_number": "",
                "password": "secret1"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(
        body["missing_fields"],
        json!(["username", "phone_number", "district"])
    );
}

#[tokio::test]
async fn wrongly_typed_body_is_a_json_validation_error() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/signup",
            None,
            json!({
                "email": "a@gmail.com",
                "username": "a",
                "full_name": "A B",
                "phone_number": 9811111111u64,
                "district": "Kathmandu",
                "password": "secret1"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("phone_number"));

    let (status, body) = send(
        &app,
        Request::post("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn login_requires_email_and_password() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "a@gmail.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn protected_route_without_token() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        Request::get("/api/auth/me").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "No token provided");
}

#[tokio::test]
async fn protected_route_with_malformed_header() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        Request::get("/api/transactions/purchases")
            .header("authorization", "Token abc")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token format");
}

#[tokio::test]
async fn protected_route_distinguishes_expired_and_invalid_tokens() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let expired = issue_token(1, "a@gmail.com", false, JWT_SECRET, -2).unwrap();
    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/reviews", Some(&expired), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token expired");

    let forged = issue_token(1, "a@gmail.com", true, "someone-elses-secret", 24).unwrap();
    let (status, body) = send(
        &app,
        json_request(Method::POST, "/api/reviews", Some(&forged), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn webhook_rejects_bad_signatures() {
    let app = test_router(lazy_pool(), NO_STRIPE);
    let payload = json!({ "id": "evt_1", "type": "payment_intent.succeeded", "data": { "object": {} } })
        .to_string();

    let unsigned = Request::post("/api/transactions/webhook")
        .body(Body::from(payload.clone()))
        .unwrap();
    let (status, body) = send(&app, unsigned).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Webhook signature verification failed");

    let now = chrono::Utc::now().timestamp();
    let wrong_secret = sign_payload(payload.as_bytes(), "whsec_wrong", now).unwrap();
    let (status, _) = send(
        &app,
        Request::post("/api/transactions/webhook")
            .header("stripe-signature", wrong_secret)
            .body(Body::from(payload))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_acknowledges_unhandled_events() {
    let app = test_router(lazy_pool(), NO_STRIPE);
    let payload = json!({ "id": "evt_2", "type": "charge.refunded", "data": { "object": {} } })
        .to_string();
    let signature =
        sign_payload(payload.as_bytes(), WEBHOOK_SECRET, chrono::Utc::now().timestamp()).unwrap();

    let (status, body) = send(
        &app,
        Request::post("/api/transactions/webhook")
            .header("stripe-signature", signature)
            .body(Body::from(payload))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["received"], true);
}

#[tokio::test]
async fn payment_intent_rejects_non_positive_amounts() {
    let state = test_state(lazy_pool(), NO_STRIPE);
    let user = AuthUser {
        id: 1,
        email: "a@gmail.com".to_string(),
        is_admin: false,
    };

    for body in [json!({ "amount": 0 }), json!({ "amount": -10 }), json!({})] {
        let req = serde_json::from_value(body).unwrap();
        let result = payments::create_payment_intent(
            State(state.clone()),
            Extension(user.clone()),
            AppJson(req),
        )
        .await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg == "Invalid amount"));
    }
}

#[tokio::test]
async fn payment_config_exposes_publishable_key_only() {
    let app = test_router(lazy_pool(), NO_STRIPE);

    let (status, body) = send(
        &app,
        Request::get("/api/payments/config").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publishableKey"], "pk_test_123");
    assert!(!body.to_string().contains("sk_test"));
}
