use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{Answer, Attempt};
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, exam_id, student_id, started_at, submitted_at, status, answers, \
    score, manual_needed, violation_count, last_violation_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttemptSummaryRow {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_email: String,
    pub(crate) student_name: String,
    pub(crate) status: AttemptStatus,
    pub(crate) score: f64,
    pub(crate) manual_needed: bool,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) violation_count: i32,
}

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Owner-scoped lookup; someone else's attempt reads as missing.
pub(crate) async fn find_owned(
    pool: &PgPool,
    id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE id = $1 AND student_id = $2"
    ))
    .bind(id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_latest(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts
         WHERE exam_id = $1 AND student_id = $2
         ORDER BY created_at DESC LIMIT 1"
    ))
    .bind(exam_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn fetch_one_by_id(pool: &PgPool, id: &str) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!("SELECT {COLUMNS} FROM attempts WHERE id = $1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Serializes the whole start sequence per (exam, student) for the duration
/// of the surrounding transaction.
pub(crate) async fn acquire_exam_student_lock(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || ':' || $2, 0))")
        .bind(exam_id)
        .bind(student_id)
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) exam_id: &'a str,
    pub(crate) student_id: &'a str,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Inserts a fresh in-progress attempt. Returns false when the partial
/// unique index already holds a live attempt for this (exam, student).
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (
            id, exam_id, student_id, started_at, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.exam_id)
    .bind(attempt.student_id)
    .bind(attempt.started_at)
    .bind(AttemptStatus::InProgress)
    .bind(attempt.created_at)
    .bind(attempt.updated_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Persists the lazily observed expiry of an overdue live attempt.
pub(crate) async fn mark_invalid(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts
         SET status = $1, submitted_at = $2, updated_at = $2
         WHERE id = $3 AND status = $4",
    )
    .bind(AttemptStatus::Invalid)
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Replaces the answer set. The status guard is part of the write so a save
/// racing a submit cannot land after the attempt went terminal.
pub(crate) async fn update_answers(
    pool: &PgPool,
    id: &str,
    answers: Vec<Answer>,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts SET answers = $1, updated_at = $2 WHERE id = $3 AND status = $4",
    )
    .bind(Json(answers))
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn submit(
    pool: &PgPool,
    id: &str,
    score: f64,
    manual_needed: bool,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts
         SET status = $1, submitted_at = $2, score = $3, manual_needed = $4, updated_at = $2
         WHERE id = $5 AND status = $6",
    )
    .bind(AttemptStatus::Submitted)
    .bind(now)
    .bind(score)
    .bind(manual_needed)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bumps the denormalized violation summary on a live attempt. Terminal
/// attempts are left untouched and report zero rows.
pub(crate) async fn record_violation(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts
         SET violation_count = violation_count + 1, last_violation_at = $1, updated_at = $1
         WHERE id = $2 AND status = $3",
    )
    .bind(now)
    .bind(id)
    .bind(AttemptStatus::InProgress)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_summaries_by_exam(
    pool: &PgPool,
    exam_id: &str,
    status: Option<AttemptStatus>,
    skip: i64,
    limit: i64,
) -> Result<Vec<AttemptSummaryRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "SELECT a.id,
                a.student_id,
                u.email AS student_email,
                u.full_name AS student_name,
                a.status,
                a.score,
                a.manual_needed,
                a.started_at,
                a.submitted_at,
                a.violation_count
         FROM attempts a
         JOIN users u ON u.id = a.student_id
         WHERE a.exam_id = ",
    );
    builder.push_bind(exam_id);

    if let Some(status) = status {
        builder.push(" AND a.status = ");
        builder.push_bind(status);
    }

    builder.push(" ORDER BY a.created_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<AttemptSummaryRow>().fetch_all(pool).await
}

pub(crate) async fn count_by_exam(
    pool: &PgPool,
    exam_id: &str,
    status: Option<AttemptStatus>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM attempts WHERE exam_id = ");
    builder.push_bind(exam_id);

    if let Some(status) = status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LatestAttemptRow {
    pub(crate) exam_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
}

/// Latest attempt per exam for one student, for listing derivations.
pub(crate) async fn latest_by_exam(
    pool: &PgPool,
    student_id: &str,
    exam_ids: &[String],
) -> Result<Vec<LatestAttemptRow>, sqlx::Error> {
    if exam_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, LatestAttemptRow>(
        "SELECT DISTINCT ON (exam_id) exam_id, status, started_at
         FROM attempts
         WHERE student_id = $1 AND exam_id = ANY($2)
         ORDER BY exam_id, created_at DESC",
    )
    .bind(student_id)
    .bind(exam_ids)
    .fetch_all(pool)
    .await
}
