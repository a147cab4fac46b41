use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::db::models::TransactionHistory;
use crate::db::{NoteRepository, NoteStatus, Transaction, TransactionRepository};
use crate::error::AppError;
use crate::payments::{to_minor_units, CreatePaymentIntent};

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub note_id: Option<i32>,
    /// Stripe payment method to confirm with right away; without it the
    /// client confirms using the returned client secret
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub transaction: Transaction,
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
    pub payment_status: String,
}

/// Best-effort cancel of a PaymentIntent whose purchase could not be recorded
async fn cancel_intent(state: &AppState, payment_intent_id: &str) {
    if let Err(e) = state.stripe.cancel_payment_intent(payment_intent_id).await {
        tracing::error!(
            "Failed to cancel payment intent {} after aborted purchase: {}",
            payment_intent_id,
            e
        );
    }
}

/// POST /api/transactions/purchase (requires auth)
///
/// The note is flipped to `sold` with a conditional update inside the same
/// database transaction that records the pending purchase, so two buyers
/// racing for one note cannot both get through. Any failure before commit
/// rolls both back.
pub async fn purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    let note_id = req
        .note_id
        .ok_or_else(|| AppError::MissingFields(vec!["note_id"]))?;

    let note = NoteRepository::get_by_id(&state.db, note_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    note.ensure_purchasable_by(auth.id)?;
    let amount = to_minor_units(note.price)?;

    let mut tx = state.db.begin().await?;

    if !NoteRepository::transition(&mut tx, note.id, NoteStatus::Active, NoteStatus::Sold).await? {
        return Err(AppError::Validation("Note is not available".to_string()));
    }

    let intent = state
        .stripe
        .create_payment_intent(&CreatePaymentIntent {
            amount,
            currency: &state.config.currency,
            payment_method: req.payment_method_id.as_deref(),
            metadata: vec![
                ("note_id", note.id.to_string()),
                ("buyer_id", auth.id.to_string()),
            ],
        })
        .await?;

    let transaction = match TransactionRepository::create_pending(
        &mut tx,
        auth.id,
        note.seller_id,
        note.id,
        note.price,
        &intent.id,
    )
    .await
    {
        Ok(transaction) => transaction,
        Err(e) => {
            cancel_intent(&state, &intent.id).await;
            return Err(e);
        }
    };

    if let Err(e) = tx.commit().await {
        cancel_intent(&state, &intent.id).await;
        return Err(e.into());
    }

    tracing::info!(
        "Purchase {} of note {} by user {} pending on {} ({})",
        transaction.id,
        note.id,
        auth.id,
        intent.id,
        intent.status
    );

    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            transaction,
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            payment_status: intent.status,
        }),
    ))
}

/// GET /api/transactions/purchases (requires auth)
pub async fn my_purchases(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TransactionHistory>>, AppError> {
    Ok(Json(TransactionRepository::purchases(&state.db, auth.id).await?))
}

/// GET /api/transactions/sales (requires auth)
pub async fn my_sales(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TransactionHistory>>, AppError> {
    Ok(Json(TransactionRepository::sales(&state.db, auth.id).await?))
}

/// GET /api/transactions/{id} (requires auth, buyer, seller or admin)
pub async fn get_transaction(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = TransactionRepository::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Transaction not found".to_string()))?;

    if !transaction.involves(auth.id) && !auth.is_admin {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }

    Ok(Json(transaction))
}
