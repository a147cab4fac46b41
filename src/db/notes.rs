use sqlx::{PgConnection, PgPool};

use crate::db::models::{NewNote, Note, NoteFilter, NoteListing, NoteStatus, NoteUpdate};
use crate::error::AppError;

pub struct NoteRepository;

const LISTING_SELECT: &str = r#"
SELECT n.id, n.seller_id, u.username AS seller_username, n.course_id,
       c.program, c.semester, c.subject_code, c.subject_name,
       n.title, n.description, n.price, n.file_url, n.status,
       r.average_rating, COALESCE(r.review_count, 0) AS review_count,
       n.created_at
FROM notes n
JOIN users u ON n.seller_id = u.id
JOIN courses c ON n.course_id = c.id
LEFT JOIN (
    SELECT note_id, AVG(rating)::float8 AS average_rating, COUNT(*) AS review_count
    FROM reviews
    GROUP BY note_id
) r ON r.note_id = n.id
"#;

impl NoteRepository {
    pub async fn create(pool: &PgPool, note: NewNote) -> Result<Note, AppError> {
        let note = sqlx::query_as::<_, Note>(
            r#"
INSERT INTO notes (seller_id, course_id, title, description, price, file_url)
VALUES ($1, $2, $3, $4, $5, $6)
RETURNING *
            "#,
        )
        .bind(note.seller_id)
        .bind(note.course_id)
        .bind(&note.title)
        .bind(&note.description)
        .bind(note.price)
        .bind(&note.file_url)
        .fetch_one(pool)
        .await?;

        Ok(note)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Note>, AppError> {
        let note = sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(note)
    }

    pub async fn get_listing(pool: &PgPool, id: i32) -> Result<Option<NoteListing>, AppError> {
        let query = format!("{} WHERE n.id = $1", LISTING_SELECT);

        let listing = sqlx::query_as::<_, NoteListing>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(listing)
    }

    /// Active notes matching the filter, newest first
    pub async fn search(pool: &PgPool, filter: &NoteFilter) -> Result<Vec<NoteListing>, AppError> {
        let query = format!(
            r#"{}
WHERE n.status = 'active'
  AND ($1::text IS NULL OR n.title ILIKE '%' || $1 || '%'
       OR n.description ILIKE '%' || $1 || '%'
       OR c.subject_name ILIKE '%' || $1 || '%'
       OR c.subject_code ILIKE '%' || $1 || '%')
  AND ($2::integer IS NULL OR n.course_id = $2)
  AND ($3::text IS NULL OR c.program = $3)
  AND ($4::integer IS NULL OR c.semester = $4)
  AND ($5::integer IS NULL OR n.seller_id = $5)
ORDER BY n.created_at DESC
            "#,
            LISTING_SELECT
        );

        let q = filter
            .q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());

        let listings = sqlx::query_as::<_, NoteListing>(&query)
            .bind(q)
            .bind(filter.course_id)
            .bind(&filter.program)
            .bind(filter.semester)
            .bind(filter.seller_id)
            .fetch_all(pool)
            .await?;

        Ok(listings)
    }

    pub async fn list_by_seller(pool: &PgPool, seller_id: i32) -> Result<Vec<NoteListing>, AppError> {
        let query = format!("{} WHERE n.seller_id = $1 ORDER BY n.created_at DESC", LISTING_SELECT);

        let listings = sqlx::query_as::<_, NoteListing>(&query)
            .bind(seller_id)
            .fetch_all(pool)
            .await?;

        Ok(listings)
    }

    /// Update an active note; `None` when the note is missing or no longer active
    pub async fn update_active(
        pool: &PgPool,
        id: i32,
        update: &NoteUpdate,
    ) -> Result<Option<Note>, AppError> {
        let note = sqlx::query_as::<_, Note>(
            r#"
UPDATE notes SET
    title = COALESCE($2, title),
    description = COALESCE($3, description),
    price = COALESCE($4, price),
    course_id = COALESCE($5, course_id),
    updated_at = NOW()
WHERE id = $1 AND status = 'active'
RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.price)
        .bind(update.course_id)
        .fetch_optional(pool)
        .await?;

        Ok(note)
    }

    /// Move a note from `from` to `to` only if it is currently in `from`.
    /// Returns false when another request changed the status first.
    pub async fn transition(
        conn: &mut PgConnection,
        id: i32,
        from: NoteStatus,
        to: NoteStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE notes SET status = $3, updated_at = NOW() WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
