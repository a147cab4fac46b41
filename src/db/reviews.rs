use sqlx::PgPool;

use crate::db::models::{RatingSummary, Review, ReviewWithAuthor};
use crate::error::AppError;

pub struct ReviewRepository;

impl ReviewRepository {
    pub async fn create(
        pool: &PgPool,
        note_id: i32,
        user_id: i32,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Review, AppError> {
        let review = sqlx::query_as::<_, Review>(
            r#"
INSERT INTO reviews (note_id, user_id, rating, comment)
VALUES ($1, $2, $3, $4)
RETURNING *
            "#,
        )
        .bind(note_id)
        .bind(user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(pool)
        .await?;

        Ok(review)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Review>, AppError> {
        let review = sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(review)
    }

    pub async fn exists_for(pool: &PgPool, user_id: i32, note_id: i32) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM reviews WHERE user_id = $1 AND note_id = $2)",
        )
        .bind(user_id)
        .bind(note_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn list_for_note(pool: &PgPool, note_id: i32) -> Result<Vec<ReviewWithAuthor>, AppError> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            r#"
SELECT r.id, r.note_id, r.user_id, u.username, r.rating, r.comment, r.created_at
FROM reviews r
JOIN users u ON r.user_id = u.id
WHERE r.note_id = $1
ORDER BY r.created_at DESC
            "#,
        )
        .bind(note_id)
        .fetch_all(pool)
        .await?;

        Ok(reviews)
    }

    /// Computed on every read; nothing is materialized on the note
    pub async fn summary_for_note(pool: &PgPool, note_id: i32) -> Result<RatingSummary, AppError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            r#"
SELECT AVG(rating)::float8 AS average_rating, COUNT(*) AS review_count
FROM reviews
WHERE note_id = $1
            "#,
        )
        .bind(note_id)
        .fetch_one(pool)
        .await?;

        Ok(summary)
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<(), AppError> {
        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}
