use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::api::webhook::settle_payment;
use crate::db::{Donation, DonationRepository, TransactionStatus};
use crate::error::AppError;
use crate::payments::{to_minor_units, CreatePaymentIntent};

#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResponse {
    pub status: String,
    pub payment_intent_id: String,
}

/// POST /api/payments/create-payment-intent (requires auth)
///
/// Starts a donation; the mobile client confirms it with the client secret.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let minor_units = req
        .amount
        .ok_or_else(|| AppError::Validation("Invalid amount".to_string()))
        .and_then(to_minor_units)?;
    // Record exactly what Stripe charges
    let amount = Decimal::new(minor_units, 2);

    let intent = state
        .stripe
        .create_payment_intent(&CreatePaymentIntent {
            amount: minor_units,
            currency: &state.config.currency,
            payment_method: None,
            metadata: vec![
                ("kind", "donation".to_string()),
                ("user_id", auth.id.to_string()),
            ],
        })
        .await?;

    let client_secret = intent
        .client_secret
        .ok_or_else(|| AppError::Stripe("Payment intent has no client secret".to_string()))?;

    DonationRepository::create_pending(&state.db, auth.id, amount, &intent.id).await?;
    tracing::info!("Donation of {} by user {} started on {}", amount, auth.id, intent.id);

    Ok(Json(PaymentIntentResponse {
        client_secret,
        payment_intent_id: intent.id,
    }))
}

/// POST /api/payments/confirm-payment (requires auth)
///
/// Called by the client after it confirmed the intent; syncs the donation with
/// what Stripe reports instead of waiting for the webhook.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    let payment_intent_id = req
        .payment_intent_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::MissingFields(vec!["paymentIntentId"]))?;

    let donation = DonationRepository::get_by_payment_id(&state.db, &payment_intent_id)
        .await?
        .filter(|donation| donation.user_id == auth.id)
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))?;

    let intent = state
        .stripe
        .retrieve_payment_intent(&donation.payment_id)
        .await?;

    if intent.succeeded() {
        settle_payment(&state.db, &intent.id, TransactionStatus::Completed).await?;
    } else if intent.failed() {
        settle_payment(&state.db, &intent.id, TransactionStatus::Failed).await?;
    }

    Ok(Json(ConfirmPaymentResponse {
        status: intent.status,
        payment_intent_id: intent.id,
    }))
}

/// GET /api/payments/config
pub async fn payment_config(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "publishableKey": state.config.stripe_publishable_key,
        "currency": state.config.currency,
    }))
}

/// GET /api/payments/donations (requires auth)
pub async fn my_donations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Donation>>, AppError> {
    Ok(Json(DonationRepository::list_by_user(&state.db, auth.id).await?))
}
