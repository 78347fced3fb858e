use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::ProctorEvent;
use crate::db::types::ViolationKind;

const COLUMNS: &str = "id, attempt_id, kind, occurred_at, meta, created_at";

pub(crate) struct CreateProctorEvent<'a> {
    pub(crate) id: &'a str,
    pub(crate) attempt_id: &'a str,
    pub(crate) kind: ViolationKind,
    pub(crate) occurred_at: PrimitiveDateTime,
    pub(crate) meta: serde_json::Value,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    event: CreateProctorEvent<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO proctor_events (id, attempt_id, kind, occurred_at, meta, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(event.id)
    .bind(event.attempt_id)
    .bind(event.kind)
    .bind(event.occurred_at)
    .bind(Json(event.meta))
    .bind(event.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<ProctorEvent>, sqlx::Error> {
    sqlx::query_as::<_, ProctorEvent>(&format!(
        "SELECT {COLUMNS} FROM proctor_events WHERE attempt_id = $1 ORDER BY created_at"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}
