use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::db::models::{Donation, TransactionStatus};
use crate::error::AppError;

pub struct DonationRepository;

impl DonationRepository {
    pub async fn create_pending(
        pool: &PgPool,
        user_id: i32,
        amount: Decimal,
        payment_id: &str,
    ) -> Result<Donation, AppError> {
        let donation = sqlx::query_as::<_, Donation>(
            r#"
INSERT INTO donations (user_id, amount, payment_id, status)
VALUES ($1, $2, $3, 'pending')
RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .bind(payment_id)
        .fetch_one(pool)
        .await?;

        Ok(donation)
    }

    pub async fn get_by_payment_id(
        pool: &PgPool,
        payment_id: &str,
    ) -> Result<Option<Donation>, AppError> {
        let donation = sqlx::query_as::<_, Donation>("SELECT * FROM donations WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(pool)
            .await?;

        Ok(donation)
    }

    pub async fn list_by_user(pool: &PgPool, user_id: i32) -> Result<Vec<Donation>, AppError> {
        let donations = sqlx::query_as::<_, Donation>(
            "SELECT * FROM donations WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(donations)
    }

    /// Settle a pending donation. A donation whose first attempt failed may
    /// still complete when the donor retries the same intent.
    pub async fn settle_pending(
        conn: &mut PgConnection,
        payment_id: &str,
        status: TransactionStatus,
    ) -> Result<Option<Donation>, AppError> {
        let donation = sqlx::query_as::<_, Donation>(
            r#"
UPDATE donations SET status = $2, updated_at = NOW()
WHERE payment_id = $1
  AND (status = 'pending' OR ($2 = 'completed' AND status = 'failed'))
RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .fetch_optional(conn)
        .await?;

        Ok(donation)
    }
}
