use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::api::errors::ApiError;
pub(crate) use crate::core::time::primitive_now_utc as now_primitive;
use crate::db::models::{Exam, Question};
use crate::repositories;
use crate::services::exam_rules;

/// Owner-scoped fetch. Someone else's exam is reported as missing rather
/// than forbidden so existence is not leaked.
pub(crate) async fn fetch_owned_exam(
    pool: &PgPool,
    exam_id: &str,
    owner_id: &str,
) -> Result<Exam, ApiError> {
    repositories::exams::find_owned(pool, exam_id, owner_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

pub(crate) fn check_exam_rules(
    window_start: PrimitiveDateTime,
    window_end: PrimitiveDateTime,
    duration_minutes: i32,
    questions: &[Question],
) -> Result<(), ApiError> {
    exam_rules::validate_exam(window_start, window_end, duration_minutes, questions)
        .map_err(|problems| ApiError::BadRequest(problems.join("; ")))
}
