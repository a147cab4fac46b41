use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use sqlx::PgPool;

use crate::api::state::AppState;
use crate::crypto::signature::{verify_stripe_signature, DEFAULT_TOLERANCE_SECS};
use crate::db::{
    DonationRepository, NoteRepository, NoteStatus, TransactionRepository, TransactionStatus,
    UserRepository,
};
use crate::error::AppError;
use crate::payments::{PaymentIntent, StripeClient};

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

impl StripeEvent {
    fn payment_intent(&self) -> Result<PaymentIntent, AppError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| AppError::Validation(format!("Invalid payment intent payload: {}", e)))
    }
}

/// Stripe call owed once a settlement is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// The purchase was reverted, so the intent must not succeed later
    CancelIntent,
    /// The intent succeeded but the note went to someone else
    Refund,
}

/// What a settled payment changed, for logging and tests
#[derive(Debug, Default, PartialEq)]
pub struct Settlement {
    pub transaction_id: Option<i32>,
    pub donation_id: Option<i32>,
    pub follow_up: Option<FollowUp>,
}

/// Record the final outcome of a PaymentIntent.
///
/// A completed purchase credits the seller; a failed one puts the note back on
/// sale and asks for the intent to be cancelled. Only pending rows move, so
/// replaying an event changes nothing. The one exception is a success arriving
/// for a purchase already marked failed: the note is claimed back if it is
/// still on sale, otherwise the payment is flagged for a refund.
pub async fn settle_payment(
    db: &PgPool,
    payment_id: &str,
    status: TransactionStatus,
) -> Result<Settlement, AppError> {
    let mut tx = db.begin().await?;
    let mut settlement = Settlement::default();

    if let Some(transaction) =
        TransactionRepository::settle_pending(&mut tx, payment_id, status).await?
    {
        match status {
            TransactionStatus::Completed => {
                UserRepository::credit_wallet(&mut tx, transaction.seller_id, transaction.amount)
                    .await?;
            }
            TransactionStatus::Failed => {
                NoteRepository::transition(
                    &mut tx,
                    transaction.note_id,
                    NoteStatus::Sold,
                    NoteStatus::Active,
                )
                .await?;
                settlement.follow_up = Some(FollowUp::CancelIntent);
            }
            TransactionStatus::Pending => {}
        }
        settlement.transaction_id = Some(transaction.id);
    } else if status == TransactionStatus::Completed {
        let failed = TransactionRepository::get_by_payment_id(&mut tx, payment_id)
            .await?
            .filter(|t| t.status == TransactionStatus::Failed);

        if let Some(failed) = failed {
            let reclaimed = NoteRepository::transition(
                &mut tx,
                failed.note_id,
                NoteStatus::Active,
                NoteStatus::Sold,
            )
            .await?;

            if reclaimed {
                TransactionRepository::complete_failed(&mut tx, payment_id).await?;
                UserRepository::credit_wallet(&mut tx, failed.seller_id, failed.amount).await?;
                tracing::warn!(
                    "Payment intent {} succeeded after failing; note {} claimed back",
                    payment_id,
                    failed.note_id
                );
            } else {
                tracing::error!(
                    "Payment intent {} succeeded after failing but note {} is gone",
                    payment_id,
                    failed.note_id
                );
                settlement.follow_up = Some(FollowUp::Refund);
            }
            settlement.transaction_id = Some(failed.id);
        }
    }

    if let Some(donation) = DonationRepository::settle_pending(&mut tx, payment_id, status).await? {
        settlement.donation_id = Some(donation.id);
    }

    tx.commit().await?;

    Ok(settlement)
}

/// Carry out the Stripe side of a committed settlement
pub async fn apply_follow_up(stripe: &StripeClient, payment_id: &str, follow_up: FollowUp) {
    match follow_up {
        FollowUp::CancelIntent => {
            // Fails if the intent succeeded meanwhile; that success event then
            // goes through the failed-purchase path above.
            if let Err(e) = stripe.cancel_payment_intent(payment_id).await {
                tracing::warn!("Failed to cancel payment intent {}: {}", payment_id, e);
            }
        }
        FollowUp::Refund => match stripe.refund_payment_intent(payment_id).await {
            Ok(refund) => tracing::info!("Refunded payment intent {} ({})", payment_id, refund.id),
            Err(e) => tracing::error!(
                "Refund of payment intent {} failed, needs manual refund: {}",
                payment_id,
                e
            ),
        },
    }
}

/// POST /api/transactions/webhook
///
/// Authenticated only by the `Stripe-Signature` header over the raw body.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let now = chrono::Utc::now().timestamp();

    let verified = headers
        .get("stripe-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Validation("Missing Stripe-Signature header".to_string()))
        .and_then(|signature| {
            verify_stripe_signature(
                &body,
                signature,
                &state.config.stripe_webhook_secret,
                now,
                DEFAULT_TOLERANCE_SECS,
            )
        });

    if let Err(e) = verified {
        tracing::warn!("Rejected webhook: {}", e);
        return Err(AppError::Validation(
            "Webhook signature verification failed".to_string(),
        ));
    }

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("Invalid event payload: {}", e)))?;

    let status = match event.kind.as_str() {
        "payment_intent.succeeded" => TransactionStatus::Completed,
        "payment_intent.payment_failed" => TransactionStatus::Failed,
        other => {
            tracing::debug!("Ignoring webhook event {} ({})", event.id, other);
            return Ok(Json(serde_json::json!({ "received": true })));
        }
    };

    let intent = event.payment_intent()?;
    let settlement = settle_payment(&state.db, &intent.id, status).await?;

    if let Some(follow_up) = settlement.follow_up {
        apply_follow_up(&state.stripe, &intent.id, follow_up).await;
    }

    if settlement == Settlement::default() {
        tracing::debug!("No pending record for payment intent {}", intent.id);
    } else {
        tracing::info!(
            "Payment intent {} settled as {:?}: {:?}",
            intent.id,
            status,
            settlement
        );
    }

    Ok(Json(serde_json::json!({ "received": true })))
}
