use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AssignmentCriteria, Exam, Question};

pub(crate) const COLUMNS: &str = "\
    id, title, description, duration_minutes, window_start, window_end, \
    questions, assignment_criteria, created_by, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Owner-scoped lookup; a non-owner gets the same `None` as a missing exam.
pub(crate) async fn find_owned(
    pool: &PgPool,
    id: &str,
    created_by: &str,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE id = $1 AND created_by = $2"
    ))
    .bind(id)
    .bind(created_by)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateExam<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration_minutes: i32,
    pub(crate) window_start: PrimitiveDateTime,
    pub(crate) window_end: PrimitiveDateTime,
    pub(crate) questions: Vec<Question>,
    pub(crate) assignment_criteria: AssignmentCriteria,
    pub(crate) created_by: &'a str,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, exam: CreateExam<'_>) -> Result<Exam, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "INSERT INTO exams (
            id, title, description, duration_minutes, window_start, window_end,
            questions, assignment_criteria, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(exam.id)
    .bind(exam.title)
    .bind(exam.description)
    .bind(exam.duration_minutes)
    .bind(exam.window_start)
    .bind(exam.window_end)
    .bind(Json(exam.questions))
    .bind(Json(exam.assignment_criteria))
    .bind(exam.created_by)
    .bind(exam.created_at)
    .bind(exam.updated_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateExam<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: Option<&'a str>,
    pub(crate) duration_minutes: i32,
    pub(crate) window_start: PrimitiveDateTime,
    pub(crate) window_end: PrimitiveDateTime,
    pub(crate) questions: Vec<Question>,
    pub(crate) assignment_criteria: AssignmentCriteria,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    created_by: &str,
    exam: UpdateExam<'_>,
) -> Result<Option<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "UPDATE exams SET
            title = $1,
            description = $2,
            duration_minutes = $3,
            window_start = $4,
            window_end = $5,
            questions = $6,
            assignment_criteria = $7,
            updated_at = $8
         WHERE id = $9 AND created_by = $10
         RETURNING {COLUMNS}",
    ))
    .bind(exam.title)
    .bind(exam.description)
    .bind(exam.duration_minutes)
    .bind(exam.window_start)
    .bind(exam.window_end)
    .bind(Json(exam.questions))
    .bind(Json(exam.assignment_criteria))
    .bind(exam.updated_at)
    .bind(id)
    .bind(created_by)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn delete_owned(
    pool: &PgPool,
    id: &str,
    created_by: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exams WHERE id = $1 AND created_by = $2")
        .bind(id)
        .bind(created_by)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_by_owner(
    pool: &PgPool,
    created_by: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams WHERE created_by = $1
         ORDER BY created_at DESC OFFSET $2 LIMIT $3"
    ))
    .bind(created_by)
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_open_at(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Vec<Exam>, sqlx::Error> {
    sqlx::query_as::<_, Exam>(&format!(
        "SELECT {COLUMNS} FROM exams
         WHERE window_start <= $1 AND window_end >= $1
         ORDER BY window_start, created_at"
    ))
    .bind(now)
    .fetch_all(pool)
    .await
}
