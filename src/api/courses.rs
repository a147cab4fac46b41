use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use crate::api::extract::AppJson;
use crate::api::middleware::AuthUser;
use crate::api::state::AppState;
use crate::db::models::NewCourse;
use crate::db::{Course, CourseRepository};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CourseQuery {
    pub program: Option<String>,
    pub semester: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CourseRequest {
    pub program: Option<String>,
    pub semester: Option<i32>,
    pub subject_code: Option<String>,
    pub subject_name: Option<String>,
}

impl CourseRequest {
    pub fn validate(self) -> Result<NewCourse, AppError> {
        let text = |value: Option<String>| value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let program = text(self.program);
        let subject_code = text(self.subject_code);
        let subject_name = text(self.subject_name);

        let mut missing = Vec::new();
        if program.is_none() {
            missing.push("program");
        }
        if self.semester.is_none() {
            missing.push("semester");
        }
        if subject_code.is_none() {
            missing.push("subject_code");
        }
        if subject_name.is_none() {
            missing.push("subject_name");
        }

        match (program, self.semester, subject_code, subject_name) {
            (Some(program), Some(semester), Some(subject_code), Some(subject_name)) => {
                if semester < 1 {
                    return Err(AppError::Validation(
                        "Semester must be a positive number".to_string(),
                    ));
                }
                Ok(NewCourse {
                    program,
                    semester,
                    subject_code: subject_code.to_uppercase(),
                    subject_name,
                })
            }
            _ => Err(AppError::MissingFields(missing)),
        }
    }
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<AppState>,
    Query(query): Query<CourseQuery>,
) -> Result<Json<Vec<Course>>, AppError> {
    let courses =
        CourseRepository::list(&state.db, query.program.as_deref(), query.semester).await?;
    Ok(Json(courses))
}

/// GET /api/courses/programs
pub async fn list_programs(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(CourseRepository::programs(&state.db).await?))
}

/// GET /api/courses/{id}
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Course>, AppError> {
    let course = CourseRepository::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// POST /api/courses (admin)
pub async fn upsert_course(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(req): AppJson<CourseRequest>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    auth.ensure_admin()?;
    let course = req.validate()?;

    let mut conn = state.db.acquire().await?;
    let course = CourseRepository::upsert(&mut conn, &course).await?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// POST /api/courses/bulk (admin)
pub async fn bulk_upsert_courses(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    AppJson(reqs): AppJson<Vec<CourseRequest>>,
) -> Result<(StatusCode, Json<Vec<Course>>), AppError> {
    auth.ensure_admin()?;

    if reqs.is_empty() {
        return Err(AppError::Validation("No courses provided".to_string()));
    }

    let courses = reqs
        .into_iter()
        .map(CourseRequest::validate)
        .collect::<Result<Vec<_>, _>>()?;

    let stored = CourseRepository::upsert_many(&state.db, &courses).await?;
    tracing::info!("Upserted {} courses", stored.len());

    Ok((StatusCode::CREATED, Json(stored)))
}
