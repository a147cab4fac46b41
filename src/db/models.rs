use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub district: String,
    pub blood_group: Option<String>,
    pub is_volunteer: bool,
    pub is_admin: bool,
    pub wallet_balance: Decimal,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What other users get to see of someone
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub full_name: String,
    pub district: String,
    pub blood_group: Option<String>,
    pub is_volunteer: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            district: user.district,
            blood_group: user.blood_group,
            is_volunteer: user.is_volunteer,
            created_at: user.created_at,
        }
    }
}

/// Fields accepted when creating a user, already validated
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone_number: String,
    pub district: String,
    pub blood_group: Option<String>,
    pub is_volunteer: bool,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub district: Option<String>,
    pub blood_group: Option<String>,
    pub is_volunteer: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub district: Option<String>,
    pub blood_group: Option<String>,
    pub volunteer: Option<bool>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Course {
    pub id: i32,
    pub program: String,
    pub semester: i32,
    pub subject_code: String,
    pub subject_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub program: String,
    pub semester: i32,
    pub subject_code: String,
    pub subject_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "note_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NoteStatus {
    Active,
    Sold,
    Removed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Note {
    pub id: i32,
    pub seller_id: i32,
    pub course_id: i32,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub file_url: String,
    pub status: NoteStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// A note can be bought while it is listed, and never by its own seller
    pub fn ensure_purchasable_by(&self, buyer_id: i32) -> Result<(), AppError> {
        if self.status != NoteStatus::Active {
            return Err(AppError::Validation("Note is not available".to_string()));
        }
        if self.seller_id == buyer_id {
            return Err(AppError::Validation(
                "You cannot buy your own note".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub seller_id: i32,
    pub course_id: i32,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub file_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub course_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoteFilter {
    pub q: Option<String>,
    pub course_id: Option<i32>,
    pub program: Option<String>,
    pub semester: Option<i32>,
    pub seller_id: Option<i32>,
}

/// Note joined with its course, seller and review aggregates
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NoteListing {
    pub id: i32,
    pub seller_id: i32,
    pub seller_username: String,
    pub course_id: i32,
    pub program: String,
    pub semester: i32,
    pub subject_code: String,
    pub subject_name: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub file_url: String,
    pub status: NoteStatus,
    pub average_rating: Option<f64>,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub note_id: i32,
    pub amount: Decimal,
    pub payment_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn involves(&self, user_id: i32) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TransactionHistory {
    pub id: i32,
    pub buyer_id: i32,
    pub seller_id: i32,
    pub note_id: i32,
    pub note_title: String,
    pub file_url: String,
    pub amount: Decimal,
    pub payment_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Review {
    pub id: i32,
    pub note_id: i32,
    pub user_id: i32,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewWithAuthor {
    pub id: i32,
    pub note_id: i32,
    pub user_id: i32,
    pub username: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Donation {
    pub id: i32,
    pub user_id: i32,
    pub amount: Decimal,
    pub payment_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
