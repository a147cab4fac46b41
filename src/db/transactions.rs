use sqlx::{PgConnection, PgPool};

use crate::db::models::{Transaction, TransactionHistory, TransactionStatus};
use crate::error::AppError;

pub struct TransactionRepository;

const HISTORY_SELECT: &str = r#"
SELECT t.id, t.buyer_id, t.seller_id, t.note_id, n.title AS note_title, n.file_url,
       t.amount, t.payment_id, t.status, t.created_at
FROM transactions t
JOIN notes n ON t.note_id = n.id
"#;

impl TransactionRepository {
    pub async fn create_pending(
        conn: &mut PgConnection,
        buyer_id: i32,
        seller_id: i32,
        note_id: i32,
        amount: rust_decimal::Decimal,
        payment_id: &str,
    ) -> Result<Transaction, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
INSERT INTO transactions (buyer_id, seller_id, note_id, amount, payment_id, status)
VALUES ($1, $2, $3, $4, $5, 'pending')
RETURNING *
            "#,
        )
        .bind(buyer_id)
        .bind(seller_id)
        .bind(note_id)
        .bind(amount)
        .bind(payment_id)
        .fetch_one(conn)
        .await?;

        Ok(transaction)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(transaction)
    }

    pub async fn purchases(pool: &PgPool, buyer_id: i32) -> Result<Vec<TransactionHistory>, AppError> {
        let query = format!("{} WHERE t.buyer_id = $1 ORDER BY t.created_at DESC", HISTORY_SELECT);

        let history = sqlx::query_as::<_, TransactionHistory>(&query)
            .bind(buyer_id)
            .fetch_all(pool)
            .await?;

        Ok(history)
    }

    pub async fn sales(pool: &PgPool, seller_id: i32) -> Result<Vec<TransactionHistory>, AppError> {
        let query = format!("{} WHERE t.seller_id = $1 ORDER BY t.created_at DESC", HISTORY_SELECT);

        let history = sqlx::query_as::<_, TransactionHistory>(&query)
            .bind(seller_id)
            .fetch_all(pool)
            .await?;

        Ok(history)
    }

    /// Settle a pending transaction. Already-settled rows are left alone, which
    /// makes redelivered webhook events no-ops.
    pub async fn settle_pending(
        conn: &mut PgConnection,
        payment_id: &str,
        status: TransactionStatus,
    ) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
UPDATE transactions SET status = $2, updated_at = NOW()
WHERE payment_id = $1 AND status = 'pending'
RETURNING *
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .fetch_optional(conn)
        .await?;

        Ok(transaction)
    }

    pub async fn get_by_payment_id(
        conn: &mut PgConnection,
        payment_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE payment_id = $1 FOR UPDATE",
        )
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;

        Ok(transaction)
    }

    /// Complete a purchase that was recorded as failed before its intent
    /// succeeded on a retry
    pub async fn complete_failed(
        conn: &mut PgConnection,
        payment_id: &str,
    ) -> Result<Option<Transaction>, AppError> {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
UPDATE transactions SET status = 'completed', updated_at = NOW()
WHERE payment_id = $1 AND status = 'failed'
RETURNING *
            "#,
        )
        .bind(payment_id)
        .fetch_optional(conn)
        .await?;

        Ok(transaction)
    }

    pub async fn has_completed_purchase(
        pool: &PgPool,
        buyer_id: i32,
        note_id: i32,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
SELECT EXISTS (
    SELECT 1 FROM transactions
    WHERE buyer_id = $1 AND note_id = $2 AND status = 'completed'
)
            "#,
        )
        .bind(buyer_id)
        .bind(note_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
