use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentFaculty;
use crate::core::state::AppState;
use crate::core::time::to_primitive_utc;
use crate::repositories;
use crate::schemas::exam::{ExamResponse, ExamUpdate};

use super::super::helpers;

pub(in crate::api::exams) async fn get_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentFaculty(user): CurrentFaculty,
    state: axum::extract::State<AppState>,
) -> Result<Json<ExamResponse>, ApiError> {
    let exam = helpers::fetch_owned_exam(state.db(), &exam_id, &user.id).await?;
    Ok(Json(ExamResponse::from_db(exam)))
}

/// Merge-update of an owned exam. Editing questions or the window while
/// attempts already exist stays allowed; the change only affects future
/// starts and submissions, never past ones.
pub(in crate::api::exams) async fn update_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentFaculty(user): CurrentFaculty,
    state: axum::extract::State<AppState>,
    Json(payload): Json<ExamUpdate>,
) -> Result<Json<ExamResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = helpers::fetch_owned_exam(state.db(), &exam_id, &user.id).await?;

    let window_start =
        payload.window.as_ref().map(|w| to_primitive_utc(w.start)).unwrap_or(existing.window_start);
    let window_end =
        payload.window.as_ref().map(|w| to_primitive_utc(w.end)).unwrap_or(existing.window_end);
    let duration_minutes = payload.duration_minutes.unwrap_or(existing.duration_minutes);
    let title = payload.title.unwrap_or(existing.title);
    let description = payload.description.or(existing.description);
    let questions = payload.questions.unwrap_or(existing.questions.0);
    let assignment_criteria =
        payload.assignment_criteria.unwrap_or(existing.assignment_criteria.0);

    helpers::check_exam_rules(window_start, window_end, duration_minutes, &questions)?;

    let updated = repositories::exams::update(
        state.db(),
        &exam_id,
        &user.id,
        repositories::exams::UpdateExam {
            title: &title,
            description: description.as_deref(),
            duration_minutes,
            window_start,
            window_end,
            questions,
            assignment_criteria,
            updated_at: helpers::now_primitive(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update exam"))?
    .ok_or_else(|| ApiError::NotFound("Exam not found".to_string()))?;

    Ok(Json(ExamResponse::from_db(updated)))
}

pub(in crate::api::exams) async fn delete_exam(
    axum::extract::Path(exam_id): axum::extract::Path<String>,
    CurrentFaculty(user): CurrentFaculty,
    state: axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = repositories::exams::delete_owned(state.db(), &exam_id, &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete exam"))?;

    if !deleted {
        return Err(ApiError::NotFound("Exam not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Exam deleted" })))
}
