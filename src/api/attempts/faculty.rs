use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentFaculty, CurrentUser};
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::attempt::{
    format_primitive, AttemptSummaryResponse, GrantRetakeRequest, GrantRetakeResponse,
    ProctorEventResponse,
};

use super::helpers;
use super::ListAttemptsQuery;

async fn fetch_owned_exam(
    state: &AppState,
    exam_id: &str,
    owner_id: &str,
) -> Result<crate::db::models::Exam, ApiError> {
    repositories::exams::find_owned(state.db(), exam_id, owner_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))
}

pub(in crate::api::attempts) async fn list_exam_attempts(
    Path(exam_id): Path<String>,
    Query(params): Query<ListAttemptsQuery>,
    CurrentFaculty(user): CurrentFaculty,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<AttemptSummaryResponse>>, ApiError> {
    let exam = fetch_owned_exam(&state, &exam_id, &user.id).await?;

    let rows = repositories::attempts::list_summaries_by_exam(
        state.db(),
        &exam.id,
        params.status,
        params.skip,
        params.limit,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list attempts"))?;

    let total_count = repositories::attempts::count_by_exam(state.db(), &exam.id, params.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count attempts"))?;

    let items = rows
        .into_iter()
        .map(|row| AttemptSummaryResponse {
            id: row.id,
            student_id: row.student_id,
            student_email: row.student_email,
            student_name: row.student_name,
            status: row.status,
            score: row.score,
            manual_needed: row.manual_needed,
            started_at: format_primitive(row.started_at),
            submitted_at: row.submitted_at.map(format_primitive),
            violations_count: row.violation_count,
        })
        .collect();

    Ok(Json(PaginatedResponse {
        items,
        total_count,
        skip: params.skip.max(0),
        limit: params.limit.clamp(1, 1000),
    }))
}

pub(in crate::api::attempts) async fn grant_retake(
    Path(exam_id): Path<String>,
    CurrentFaculty(user): CurrentFaculty,
    State(state): State<AppState>,
    Json(payload): Json<GrantRetakeRequest>,
) -> Result<Json<GrantRetakeResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let exam = fetch_owned_exam(&state, &exam_id, &user.id).await?;

    let student = repositories::users::find_by_id(state.db(), &payload.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?;

    let Some(student) = student else {
        return Err(ApiError::BadRequest("Student not found".to_string()));
    };
    if student.role != UserRole::Student {
        return Err(ApiError::BadRequest("Retakes can only be granted to students".to_string()));
    }

    let remaining = repositories::retake_grants::grant(
        state.db(),
        &exam.id,
        &student.id,
        payload.count,
        helpers::now_primitive(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grant retake"))?;

    tracing::info!(
        exam_id = %exam.id,
        student_id = %student.id,
        count = payload.count,
        remaining,
        "Retake granted"
    );

    Ok(Json(GrantRetakeResponse { exam_id: exam.id, student_id: student.id, remaining }))
}

/// Audit-log read, authorized for the attempt's own student or the faculty
/// member who owns the referenced exam.
pub(in crate::api::attempts) async fn list_proctor_events(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ProctorEventResponse>>, ApiError> {
    let attempt = repositories::attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    let is_owner = user.role == UserRole::Student && attempt.student_id == user.id;
    let is_faculty_owner = if matches!(user.role, UserRole::Faculty | UserRole::Admin) {
        repositories::exams::find_owned(state.db(), &attempt.exam_id, &user.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
            .is_some()
    } else {
        false
    };

    if !is_owner && !is_faculty_owner {
        return Err(ApiError::Forbidden("Not allowed to view these events"));
    }

    let events = repositories::proctor_events::list_by_attempt(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list proctor events"))?;

    let events = events
        .into_iter()
        .map(|event| ProctorEventResponse {
            id: event.id,
            attempt_id: event.attempt_id,
            kind: event.kind,
            occurred_at: format_primitive(event.occurred_at),
            meta: event.meta.0,
        })
        .collect();

    Ok(Json(events))
}
