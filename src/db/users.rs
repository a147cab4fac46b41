use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::db::models::{NewUser, User, UserFilter, UserUpdate};
use crate::error::AppError;

pub struct UserRepository;

impl UserRepository {
    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
INSERT INTO users (email, username, full_name, phone_number, district, blood_group, is_volunteer, password_hash)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.full_name)
        .bind(&new_user.phone_number)
        .bind(&new_user.district)
        .bind(&new_user.blood_group)
        .bind(new_user.is_volunteer)
        .bind(&new_user.password_hash)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(pool)
            .await?;

        Ok(user)
    }

    pub async fn exists(pool: &PgPool, email: &str, username: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) OR username = $2)",
        )
        .bind(email)
        .bind(username)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Apply the fields present in `update`, leaving the rest untouched
    pub async fn update(
        pool: &PgPool,
        id: i32,
        update: &UserUpdate,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
UPDATE users SET
    username = COALESCE($2, username),
    full_name = COALESCE($3, full_name),
    phone_number = COALESCE($4, phone_number),
    district = COALESCE($5, district),
    blood_group = COALESCE($6, blood_group),
    is_volunteer = COALESCE($7, is_volunteer),
    updated_at = NOW()
WHERE id = $1
RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.username)
        .bind(&update.full_name)
        .bind(&update.phone_number)
        .bind(&update.district)
        .bind(&update.blood_group)
        .bind(update.is_volunteer)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn search(pool: &PgPool, filter: &UserFilter) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
SELECT * FROM users
WHERE ($1::text IS NULL OR LOWER(district) = LOWER($1))
  AND ($2::text IS NULL OR blood_group = $2)
  AND ($3::boolean IS NULL OR is_volunteer = $3)
ORDER BY full_name
            "#,
        )
        .bind(&filter.district)
        .bind(&filter.blood_group)
        .bind(filter.volunteer)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    pub async fn credit_wallet(
        conn: &mut PgConnection,
        id: i32,
        amount: Decimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET wallet_balance = wallet_balance + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .execute(conn)
        .await?;

        Ok(())
    }
}
