pub mod auth;
pub mod courses;
pub mod extract;
pub mod middleware;
pub mod notes;
pub mod payments;
pub mod reviews;
pub mod state;
pub mod transactions;
pub mod users;
pub mod webhook;

pub use extract::AppJson;
pub use middleware::AuthUser;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::time::Duration;
use tower_http::{cors::CorsLayer, services::ServeDir, timeout::TimeoutLayer, trace::TraceLayer};

use crate::storage::PUBLIC_PREFIX;

/// Room for the text fields that travel with an uploaded file
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

pub fn create_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    let public = Router::new()
        .route("/api/health", get(health))
        // Authentication endpoints
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        // Catalog
        .route("/api/courses", get(courses::list_courses))
        .route("/api/courses/programs", get(courses::list_programs))
        .route("/api/courses/{id}", get(courses::get_course))
        .route("/api/notes", get(notes::list_notes))
        .route("/api/notes/{id}", get(notes::get_note))
        .route("/api/reviews/note/{note_id}", get(reviews::note_reviews))
        .route("/api/payments/config", get(payments::payment_config))
        // Stripe calls this one, authenticated by signature
        .route("/api/transactions/webhook", post(webhook::stripe_webhook));

    let protected = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::search_users))
        .route("/api/users/{id}", get(users::get_user).put(users::update_user))
        .route("/api/courses", post(courses::upsert_course))
        .route("/api/courses/bulk", post(courses::bulk_upsert_courses))
        .route(
            "/api/notes",
            post(notes::create_note).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/notes/mine", get(notes::my_notes))
        .route(
            "/api/notes/{id}",
            put(notes::update_note).delete(notes::delete_note),
        )
        .route("/api/reviews", post(reviews::create_review))
        .route("/api/reviews/{id}", axum::routing::delete(reviews::delete_review))
        .route("/api/transactions/purchase", post(transactions::purchase))
        .route("/api/transactions/purchases", get(transactions::my_purchases))
        .route("/api/transactions/sales", get(transactions::my_sales))
        .route("/api/transactions/{id}", get(transactions::get_transaction))
        .route(
            "/api/payments/create-payment-intent",
            post(payments::create_payment_intent),
        )
        .route("/api/payments/confirm-payment", post(payments::confirm_payment))
        .route("/api/payments/donations", get(payments::my_donations))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&state.config.upload_dir))
        .layer(TimeoutLayer::new(Duration::from_secs(
            state.config.request_timeout_secs,
        )))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
