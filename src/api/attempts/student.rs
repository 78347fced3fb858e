use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{student_profile, CurrentStudent};
use crate::core::state::AppState;
use crate::db::models::{Attempt, Exam};
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::attempt::{
    format_primitive, AttemptResponse, ProctorEventRequest, SaveAnswersRequest,
    SaveAnswersResponse, StartAttemptRequest, StartAttemptResponse, SubmitAttemptResponse,
};
use crate::schemas::exam::SanitizedExamResponse;
use crate::services::{attempt_timing, eligibility, scoring};

use super::helpers;

pub(in crate::api::attempts) async fn start_attempt(
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    let exam = repositories::exams::find_by_id(state.db(), &payload.exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    let now = helpers::now_primitive();

    if now < exam.window_start || now > exam.window_end {
        return Err(ApiError::NotActive("Exam is not active right now"));
    }

    if !eligibility::matches(&exam.assignment_criteria.0, &student_profile(&user)) {
        return Err(ApiError::Forbidden("You are not assigned to this exam"));
    }

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    repositories::attempts::acquire_exam_student_lock(&mut *tx, &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to acquire attempt lock"))?;

    let latest = repositories::attempts::find_latest(&mut *tx, &exam.id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch latest attempt"))?;

    match latest {
        // Live and still inside its own deadline: hand the same attempt back.
        Some(attempt)
            if attempt.status == AttemptStatus::InProgress
                && !attempt_timing::is_elapsed(attempt.started_at, exam.duration_minutes, now) =>
        {
            tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
            Ok(Json(start_response(attempt, exam)))
        }
        // Live but overdue: persist the expiry, then a new attempt needs a grant.
        Some(attempt) if attempt.status == AttemptStatus::InProgress => {
            repositories::attempts::mark_invalid(&mut *tx, &attempt.id, now)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to finalize attempt"))?;

            let consumed =
                repositories::retake_grants::consume_one(&mut *tx, &exam.id, &user.id, now)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to consume retake grant"))?;

            if !consumed {
                // Keep the finalization even though the start is refused.
                tx.commit()
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
                return Err(ApiError::AlreadyEnded(
                    "Your previous attempt has already ended. Please contact faculty.",
                ));
            }

            create_and_respond(tx, state, exam, &user.id, now).await
        }
        // Submitted or invalid: only a retake grant buys a fresh attempt.
        Some(_) => {
            let consumed =
                repositories::retake_grants::consume_one(&mut *tx, &exam.id, &user.id, now)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to consume retake grant"))?;

            if !consumed {
                return Err(ApiError::AlreadySubmitted("You have already submitted this exam."));
            }

            create_and_respond(tx, state, exam, &user.id, now).await
        }
        // First ever start for this (exam, student).
        None => create_and_respond(tx, state, exam, &user.id, now).await,
    }
}

async fn create_and_respond(
    mut tx: sqlx::Transaction<'_, sqlx::Postgres>,
    state: AppState,
    exam: Exam,
    student_id: &str,
    now: time::PrimitiveDateTime,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    let attempt_id = Uuid::new_v4().to_string();
    let inserted = repositories::attempts::create(
        &mut *tx,
        repositories::attempts::CreateAttempt {
            id: &attempt_id,
            exam_id: &exam.id,
            student_id,
            started_at: now,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create attempt"))?;

    if !inserted {
        // The partial unique index caught a live attempt the latest-lookup
        // did not see; resume it instead of failing the student.
        let existing = repositories::attempts::find_latest(&mut *tx, &exam.id, student_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
            .ok_or_else(|| {
                ApiError::Internal("Attempt missing after conflicting insert".to_string())
            })?;
        tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;
        return Ok(Json(start_response(existing, exam)));
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    let attempt = repositories::attempts::fetch_one_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?;

    tracing::info!(
        exam_id = %exam.id,
        attempt_id = %attempt.id,
        student_id = %student_id,
        "Attempt started"
    );

    Ok(Json(start_response(attempt, exam)))
}

fn start_response(attempt: Attempt, exam: Exam) -> StartAttemptResponse {
    let end_at = attempt_timing::attempt_deadline(attempt.started_at, exam.duration_minutes);

    StartAttemptResponse {
        attempt_id: attempt.id,
        server_start_time: format_primitive(attempt.started_at),
        server_end_time: format_primitive(end_at),
        duration_minutes: exam.duration_minutes,
        exam: SanitizedExamResponse::from_db(exam),
    }
}

pub(in crate::api::attempts) async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AttemptResponse>, ApiError> {
    let attempt = helpers::fetch_owned_attempt(state.db(), &attempt_id, &user.id).await?;
    Ok(Json(AttemptResponse::from_db(attempt)))
}

pub(in crate::api::attempts) async fn save_answers(
    Path(attempt_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SaveAnswersRequest>,
) -> Result<Json<SaveAnswersResponse>, ApiError> {
    let attempt = helpers::fetch_owned_attempt(state.db(), &attempt_id, &user.id).await?;

    if attempt.status != AttemptStatus::InProgress {
        return Err(ApiError::InvalidState("Attempt is not in progress"));
    }

    let exam = helpers::fetch_attempt_exam(state.db(), &attempt.exam_id).await?;

    let now = helpers::now_primitive();
    if attempt_timing::is_elapsed(attempt.started_at, exam.duration_minutes, now) {
        return Err(ApiError::TimeOver("Exam time is over"));
    }

    let interval = state.settings().exam().auto_save_interval_seconds.max(1);
    let rate_key = format!("autosave:{attempt_id}");
    let allowed = state.redis().rate_limit(&rate_key, 1, interval).await.unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Auto-save rate limit exceeded"));
    }

    let patches = helpers::parse_answer_patches(payload.answers);
    let merged = helpers::merge_answers(attempt.answers.0, patches);
    let saved_answers = merged.len();

    // The status re-check inside the UPDATE rejects a save racing a submit.
    let updated = repositories::attempts::update_answers(state.db(), &attempt_id, merged, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to save answers"))?;

    if !updated {
        return Err(ApiError::InvalidState("Attempt is not in progress"));
    }

    Ok(Json(SaveAnswersResponse { ok: true, saved_answers }))
}

/// Submission is not time-gated: a late submit is accepted and scored from
/// whatever answers were saved. The attempt goes terminal either way.
pub(in crate::api::attempts) async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SubmitAttemptResponse>, ApiError> {
    let attempt = helpers::fetch_owned_attempt(state.db(), &attempt_id, &user.id).await?;

    if attempt.status != AttemptStatus::InProgress {
        return Err(ApiError::InvalidState("Attempt is not in progress"));
    }

    let exam = helpers::fetch_attempt_exam(state.db(), &attempt.exam_id).await?;

    let outcome = scoring::score(&exam.questions.0, &attempt.answers.0);
    let now = helpers::now_primitive();

    let updated = repositories::attempts::submit(
        state.db(),
        &attempt_id,
        outcome.total,
        outcome.manual_needed,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to submit attempt"))?;

    if !updated {
        return Err(ApiError::InvalidState("Attempt is not in progress"));
    }

    tracing::info!(
        attempt_id = %attempt_id,
        student_id = %user.id,
        score = outcome.total,
        manual_needed = outcome.manual_needed,
        "Attempt submitted"
    );

    Ok(Json(SubmitAttemptResponse {
        score: outcome.total,
        manual_needed: outcome.manual_needed,
        submitted_at: format_primitive(now),
    }))
}

/// Best-effort telemetry: events on terminal attempts are ignored rather
/// than refused, and recording never alters the attempt lifecycle.
pub(in crate::api::attempts) async fn record_proctor_event(
    Path(attempt_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<ProctorEventRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let attempt = helpers::fetch_owned_attempt(state.db(), &attempt_id, &user.id).await?;

    if attempt.status.is_terminal() {
        return Ok(Json(serde_json::json!({ "ok": true })));
    }

    let now = helpers::now_primitive();
    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to start transaction"))?;

    let recorded = repositories::attempts::record_violation(&mut *tx, &attempt_id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record violation"))?;

    if recorded {
        repositories::proctor_events::create(
            &mut *tx,
            repositories::proctor_events::CreateProctorEvent {
                id: &Uuid::new_v4().to_string(),
                attempt_id: &attempt_id,
                kind: payload.kind,
                occurred_at: now,
                meta: payload.meta.unwrap_or(serde_json::Value::Null),
                created_at: now,
            },
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to record proctor event"))?;
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit transaction"))?;

    Ok(Json(serde_json::json!({ "ok": true })))
}
