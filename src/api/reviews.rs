use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::db::models::ReviewWithAuthor;
use crate::db::{NoteRepository, Review, ReviewRepository, TransactionRepository};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub note_id: Option<i32>,
    pub rating: Option<serde_json::Value>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteReviews {
    pub reviews: Vec<ReviewWithAuthor>,
    pub average_rating: Option<f64>,
    pub review_count: i64,
}

/// Accept only whole numbers from 1 to 5
pub fn validate_rating(rating: &serde_json::Value) -> Result<i16, AppError> {
    rating
        .as_i64()
        .filter(|r| (1..=5).contains(r))
        .map(|r| r as i16)
        .ok_or_else(|| AppError::Validation("Rating must be between 1 and 5".to_string()))
}

/// POST /api/reviews (requires auth)
pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let (Some(note_id), Some(rating)) = (req.note_id, req.rating.as_ref()) else {
        let mut missing = Vec::new();
        if req.note_id.is_none() {
            missing.push("note_id");
        }
        if req.rating.is_none() {
            missing.push("rating");
        }
        return Err(AppError::MissingFields(missing));
    };

    let rating = validate_rating(rating)?;

    if NoteRepository::get_by_id(&state.db, note_id).await?.is_none() {
        return Err(AppError::NotFound("Note not found".to_string()));
    }

    if !TransactionRepository::has_completed_purchase(&state.db, auth.id, note_id).await? {
        return Err(AppError::Forbidden(
            "You can only review notes you have purchased".to_string(),
        ));
    }

    if ReviewRepository::exists_for(&state.db, auth.id, note_id).await? {
        return Err(AppError::Conflict(
            "You have already reviewed this note".to_string(),
        ));
    }

    let comment = req
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let review = ReviewRepository::create(&state.db, note_id, auth.id, rating, comment).await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/note/{note_id}
pub async fn note_reviews(
    State(state): State<AppState>,
    Path(note_id): Path<i32>,
) -> Result<Json<NoteReviews>, AppError> {
    let reviews = ReviewRepository::list_for_note(&state.db, note_id).await?;
    let summary = ReviewRepository::summary_for_note(&state.db, note_id).await?;

    Ok(Json(NoteReviews {
        reviews,
        average_rating: summary.average_rating,
        review_count: summary.review_count,
    }))
}

/// DELETE /api/reviews/{id} (requires auth, author or admin)
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let review = ReviewRepository::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".to_string()))?;

    auth.ensure_self_or_admin(review.user_id)?;
    ReviewRepository::delete(&state.db, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rating_range() {
        for r in 1..=5 {
            assert_eq!(validate_rating(&json!(r)).unwrap(), r as i16);
        }
        for bad in [json!(0), json!(6), json!(-1), json!(4.5), json!("5"), json!(null)] {
            assert!(validate_rating(&bad).is_err(), "{} accepted", bad);
        }
    }
}
