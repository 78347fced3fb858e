use std::collections::{HashMap, HashSet};

use axum::{extract::Query, Json};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::{student_profile, CurrentFaculty, CurrentStudent};
use crate::api::pagination::default_limit;
use crate::core::state::AppState;
use crate::db::types::AttemptStatus;
use crate::repositories;
use crate::schemas::exam::{
    format_primitive, AvailabilityStatus, AvailableExamResponse, ExamResponse, WindowResponse,
};
use crate::services::{attempt_timing, eligibility};

use super::super::helpers;

#[derive(Debug, Deserialize)]
pub(crate) struct ListExamsQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub(in crate::api::exams) async fn list_exams(
    CurrentFaculty(user): CurrentFaculty,
    state: axum::extract::State<AppState>,
    Query(params): Query<ListExamsQuery>,
) -> Result<Json<Vec<ExamResponse>>, ApiError> {
    let exams =
        repositories::exams::list_by_owner(state.db(), &user.id, params.skip, params.limit)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    Ok(Json(exams.into_iter().map(ExamResponse::from_db).collect()))
}

/// Student listing: exams whose window is open right now and whose
/// assignment criteria match the caller, each labeled with the caller's
/// progress. A terminal attempt is re-labeled `not-started` while an unspent
/// retake grant exists; that re-labeling is purely presentational.
pub(in crate::api::exams) async fn available_exams(
    CurrentStudent(user): CurrentStudent,
    state: axum::extract::State<AppState>,
) -> Result<Json<Vec<AvailableExamResponse>>, ApiError> {
    let now = helpers::now_primitive();
    let profile = student_profile(&user);

    let exams = repositories::exams::list_open_at(state.db(), now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exams"))?;

    let eligible: Vec<_> = exams
        .into_iter()
        .filter(|exam| eligibility::matches(&exam.assignment_criteria.0, &profile))
        .collect();

    let exam_ids: Vec<String> = eligible.iter().map(|exam| exam.id.clone()).collect();

    let latest = repositories::attempts::latest_by_exam(state.db(), &user.id, &exam_ids)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempts"))?;
    let latest: HashMap<String, _> =
        latest.into_iter().map(|row| (row.exam_id.clone(), row)).collect();

    let granted: HashSet<String> =
        repositories::retake_grants::exam_ids_with_grant(state.db(), &user.id, &exam_ids)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch retake grants"))?
            .into_iter()
            .collect();

    let result = eligible
        .into_iter()
        .map(|exam| {
            let status = match latest.get(&exam.id) {
                None => AvailabilityStatus::NotStarted,
                Some(row) => {
                    let effective = attempt_timing::effective_status(
                        row.status,
                        row.started_at,
                        exam.duration_minutes,
                        now,
                    );
                    match effective {
                        AttemptStatus::InProgress => AvailabilityStatus::InProgress,
                        AttemptStatus::Submitted | AttemptStatus::Invalid
                            if granted.contains(&exam.id) =>
                        {
                            AvailabilityStatus::NotStarted
                        }
                        AttemptStatus::Submitted => AvailabilityStatus::Submitted,
                        AttemptStatus::Invalid => AvailabilityStatus::Invalid,
                    }
                }
            };

            AvailableExamResponse {
                id: exam.id,
                title: exam.title,
                description: exam.description,
                duration_minutes: exam.duration_minutes,
                window: WindowResponse {
                    start: format_primitive(exam.window_start),
                    end: format_primitive(exam.window_end),
                },
                status,
            }
        })
        .collect();

    Ok(Json(result))
}
