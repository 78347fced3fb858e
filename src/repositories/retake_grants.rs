use sqlx::PgPool;
use time::PrimitiveDateTime;

/// Faculty grant: tops up an existing entry or inserts a fresh one. Returns
/// the resulting remaining count.
pub(crate) async fn grant(
    pool: &PgPool,
    exam_id: &str,
    student_id: &str,
    count: i32,
    now: PrimitiveDateTime,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "INSERT INTO retake_grants (exam_id, student_id, remaining, granted_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (exam_id, student_id)
         DO UPDATE SET remaining = retake_grants.remaining + EXCLUDED.remaining,
                       granted_at = EXCLUDED.granted_at
         RETURNING remaining",
    )
    .bind(exam_id)
    .bind(student_id)
    .bind(count)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Conditional single-unit decrement. The `remaining > 0` guard is the
/// check-and-set that keeps concurrent starts from double-spending a unit.
pub(crate) async fn consume_one(
    executor: impl sqlx::PgExecutor<'_>,
    exam_id: &str,
    student_id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE retake_grants
         SET remaining = remaining - 1, granted_at = $3
         WHERE exam_id = $1 AND student_id = $2 AND remaining > 0",
    )
    .bind(exam_id)
    .bind(student_id)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn exam_ids_with_grant(
    pool: &PgPool,
    student_id: &str,
    exam_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if exam_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar::<_, String>(
        "SELECT exam_id FROM retake_grants
         WHERE student_id = $1 AND exam_id = ANY($2) AND remaining > 0",
    )
    .bind(student_id)
    .bind(exam_ids)
    .fetch_all(pool)
    .await
}
