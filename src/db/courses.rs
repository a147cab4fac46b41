use sqlx::{PgConnection, PgPool};

use crate::db::models::{Course, NewCourse};
use crate::error::AppError;

pub struct CourseRepository;

impl CourseRepository {
    pub async fn list(
        pool: &PgPool,
        program: Option<&str>,
        semester: Option<i32>,
    ) -> Result<Vec<Course>, AppError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
SELECT * FROM courses
WHERE ($1::text IS NULL OR program = $1)
  AND ($2::integer IS NULL OR semester = $2)
ORDER BY program, semester, subject_code
            "#,
        )
        .bind(program)
        .bind(semester)
        .fetch_all(pool)
        .await?;

        Ok(courses)
    }

    pub async fn programs(pool: &PgPool) -> Result<Vec<String>, AppError> {
        let programs =
            sqlx::query_scalar::<_, String>("SELECT DISTINCT program FROM courses ORDER BY program")
                .fetch_all(pool)
                .await?;

        Ok(programs)
    }

    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(course)
    }

    /// Insert a course, or refresh its name if (program, semester, subject_code)
    /// already exists.
    pub async fn upsert(conn: &mut PgConnection, course: &NewCourse) -> Result<Course, AppError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
INSERT INTO courses (program, semester, subject_code, subject_name)
VALUES ($1, $2, $3, $4)
ON CONFLICT (program, semester, subject_code)
DO UPDATE SET subject_name = EXCLUDED.subject_name
RETURNING *
            "#,
        )
        .bind(&course.program)
        .bind(course.semester)
        .bind(&course.subject_code)
        .bind(&course.subject_name)
        .fetch_one(conn)
        .await?;

        Ok(course)
    }

    pub async fn upsert_many(pool: &PgPool, courses: &[NewCourse]) -> Result<Vec<Course>, AppError> {
        let mut tx = pool.begin().await?;
        let mut stored = Vec::with_capacity(courses.len());

        for course in courses {
            stored.push(Self::upsert(&mut tx, course).await?);
        }

        tx.commit().await?;

        Ok(stored)
    }
}
