use std::str::FromStr;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use rust_decimal::Decimal;

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::db::models::{NewNote, NoteFilter, NoteUpdate};
use crate::db::{CourseRepository, Note, NoteListing, NoteRepository, NoteStatus};
use crate::error::AppError;
use crate::storage;

/// Text fields and file collected from a note upload form
#[derive(Debug, Default)]
pub struct NoteForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub course_id: Option<String>,
    pub file_name: Option<String>,
    pub file: Option<Vec<u8>>,
}

/// Validated note form, ready to store
#[derive(Debug)]
pub struct ValidNoteForm {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub course_id: i32,
    pub extension: String,
    pub file: Vec<u8>,
}

pub fn parse_price(raw: &str) -> Result<Decimal, AppError> {
    let price = Decimal::from_str(raw.trim())
        .map_err(|_| AppError::Validation("Price must be a number".to_string()))?;

    let price = price.round_dp(2);
    if price <= Decimal::ZERO {
        return Err(AppError::Validation("Price must be greater than zero".to_string()));
    }
    if price > max_price() {
        return Err(AppError::Validation("Price is too large".to_string()));
    }

    Ok(price)
}

/// Largest value the NUMERIC(10,2) price column holds
fn max_price() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}

impl NoteForm {
    pub fn validate(self, max_upload_bytes: usize) -> Result<ValidNoteForm, AppError> {
        let title = self.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

        let mut missing = Vec::new();
        if title.is_none() {
            missing.push("title");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if self.course_id.is_none() {
            missing.push("course_id");
        }
        if self.file.is_none() {
            missing.push("file");
        }

        let (Some(title), Some(price), Some(course_id), Some(file)) =
            (title, self.price, self.course_id, self.file)
        else {
            return Err(AppError::MissingFields(missing));
        };

        let price = parse_price(&price)?;
        let course_id = course_id
            .trim()
            .parse()
            .map_err(|_| AppError::Validation("Invalid course_id".to_string()))?;

        let extension = storage::validate_upload(
            self.file_name.as_deref().unwrap_or_default(),
            file.len(),
            max_upload_bytes,
        )?;

        Ok(ValidNoteForm {
            title,
            description: self.description.unwrap_or_default().trim().to_string(),
            price,
            course_id,
            extension,
            file,
        })
    }
}

async fn read_form(mut multipart: Multipart) -> Result<NoteForm, AppError> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Invalid form data: {}", e))
    };

    let mut form = NoteForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.file = Some(field.bytes().await.map_err(bad_form)?.to_vec());
            }
            "title" => form.title = Some(field.text().await.map_err(bad_form)?),
            "description" => form.description = Some(field.text().await.map_err(bad_form)?),
            "price" => form.price = Some(field.text().await.map_err(bad_form)?),
            "course_id" => form.course_id = Some(field.text().await.map_err(bad_form)?),
            other => tracing::debug!("Ignoring unknown form field {}", other),
        }
    }

    Ok(form)
}

async fn load_note(state: &AppState, id: i32) -> Result<Note, AppError> {
    NoteRepository::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
}

/// GET /api/notes
pub async fn list_notes(
    State(state): State<AppState>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<NoteListing>>, AppError> {
    Ok(Json(NoteRepository::search(&state.db, &filter).await?))
}

/// GET /api/notes/mine (requires auth)
pub async fn my_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<NoteListing>>, AppError> {
    Ok(Json(NoteRepository::list_by_seller(&state.db, auth.id).await?))
}

/// GET /api/notes/{id}
pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<NoteListing>, AppError> {
    let listing = NoteRepository::get_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;

    Ok(Json(listing))
}

/// POST /api/notes (requires auth, multipart)
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Note>), AppError> {
    let form = read_form(multipart)
        .await?
        .validate(state.config.max_upload_bytes)?;

    if CourseRepository::get_by_id(&state.db, form.course_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let file_url =
        storage::save_upload(&state.config.upload_dir, &form.extension, &form.file).await?;

    let created = NoteRepository::create(
        &state.db,
        NewNote {
            seller_id: auth.id,
            course_id: form.course_id,
            title: form.title,
            description: form.description,
            price: form.price,
            file_url: file_url.clone(),
        },
    )
    .await;

    let note = match created {
        Ok(note) => note,
        Err(e) => {
            if let Err(cleanup) =
                storage::remove_upload(&state.config.upload_dir, &file_url).await
            {
                tracing::warn!("Failed to remove orphaned upload {}: {}", file_url, cleanup);
            }
            return Err(e);
        }
    };

    tracing::info!("User {} listed note {}", auth.id, note.id);

    Ok((StatusCode::CREATED, Json(note)))
}

/// PUT /api/notes/{id} (requires auth, owner only)
pub async fn update_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
    AppJson(update): AppJson<NoteUpdate>,
) -> Result<Json<Note>, AppError> {
    let note = load_note(&state, id).await?;

    if note.seller_id != auth.id {
        return Err(AppError::Forbidden(
            "You can only edit your own notes".to_string(),
        ));
    }

    if note.status != NoteStatus::Active {
        return Err(AppError::Validation("Only active notes can be edited".to_string()));
    }

    if update.price.is_some_and(|price| price <= Decimal::ZERO) {
        return Err(AppError::Validation("Price must be greater than zero".to_string()));
    }

    if let Some(course_id) = update.course_id {
        if CourseRepository::get_by_id(&state.db, course_id).await?.is_none() {
            return Err(AppError::NotFound("Course not found".to_string()));
        }
    }

    // Sold between the read and the write
    let note = NoteRepository::update_active(&state.db, id, &update)
        .await?
        .ok_or_else(|| AppError::Validation("Only active notes can be edited".to_string()))?;

    Ok(Json(note))
}

/// DELETE /api/notes/{id} (requires auth, owner or admin)
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    let note = load_note(&state, id).await?;
    auth.ensure_self_or_admin(note.seller_id)?;

    let mut conn = state.db.acquire().await?;
    let removed =
        NoteRepository::transition(&mut conn, id, NoteStatus::Active, NoteStatus::Removed).await?;

    if !removed {
        return Err(AppError::Validation("Only active notes can be removed".to_string()));
    }

    tracing::info!("Note {} removed by user {}", id, auth.id);

    Ok(Json(serde_json::json!({ "message": "Note removed" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1024;

    fn form() -> NoteForm {
        NoteForm {
            title: Some("Operating Systems".to_string()),
            description: Some(" unit 1-5 ".to_string()),
            price: Some("250".to_string()),
            course_id: Some("4".to_string()),
            file_name: Some("os.pdf".to_string()),
            file: Some(b"%PDF-1.4".to_vec()),
        }
    }

    #[test]
    fn test_valid_form() {
        let valid = form().validate(MAX).unwrap();
        assert_eq!(valid.price, Decimal::new(250, 0));
        assert_eq!(valid.course_id, 4);
        assert_eq!(valid.extension, "pdf");
        assert_eq!(valid.description, "unit 1-5");
    }

    #[test]
    fn test_missing_form_fields() {
        let err = NoteForm {
            file: None,
            title: Some(" ".to_string()),
            ..form()
        }
        .validate(MAX)
        .unwrap_err();

        assert!(matches!(err, AppError::MissingFields(f) if f == vec!["title", "file"]));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("19.999").unwrap(), Decimal::new(2000, 2));
        assert!(parse_price("0").is_err());
        assert!(parse_price("-1").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("0.001").is_err());
        assert!(parse_price("100000000").is_err());
        assert_eq!(parse_price("99999999.99").unwrap(), Decimal::new(99_999_999_99, 2));
    }

    #[test]
    fn test_rejects_disallowed_file() {
        let err = NoteForm {
            file_name: Some("virus.exe".to_string()),
            ..form()
        }
        .validate(MAX)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = NoteForm {
            file: Some(vec![0; MAX + 1]),
            ..form()
        }
        .validate(MAX)
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "File too large"));
    }
}
