use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentFaculty;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::exam::{ExamCreate, ExamResponse};

use super::super::helpers;

pub(in crate::api::exams) async fn create_exam(
    CurrentFaculty(user): CurrentFaculty,
    state: axum::extract::State<AppState>,
    Json(payload): Json<ExamCreate>,
) -> Result<(axum::http::StatusCode, Json<ExamResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let window_start = to_primitive_utc(payload.window.start);
    let window_end = to_primitive_utc(payload.window.end);

    helpers::check_exam_rules(
        window_start,
        window_end,
        payload.duration_minutes,
        &payload.questions,
    )?;

    let now = primitive_now_utc();
    let exam = repositories::exams::create(
        state.db(),
        repositories::exams::CreateExam {
            id: &Uuid::new_v4().to_string(),
            title: &payload.title,
            description: payload.description.as_deref(),
            duration_minutes: payload.duration_minutes,
            window_start,
            window_end,
            questions: payload.questions,
            assignment_criteria: payload.assignment_criteria,
            created_by: &user.id,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam"))?;

    Ok((axum::http::StatusCode::CREATED, Json(ExamResponse::from_db(exam))))
}
