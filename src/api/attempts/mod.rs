pub(crate) mod helpers;
mod faculty;
mod student;

use axum::{routing::get, routing::post, Router};
use serde::Deserialize;

use crate::api::pagination::default_limit;
use crate::core::state::AppState;
use crate::db::types::AttemptStatus;

#[derive(Debug, Deserialize)]
pub(crate) struct ListAttemptsQuery {
    #[serde(default)]
    pub(crate) status: Option<AttemptStatus>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        // Student endpoints
        .route("/start", post(student::start_attempt))
        .route("/:attempt_id", get(student::get_attempt))
        .route("/:attempt_id/save", post(student::save_answers))
        .route("/:attempt_id/submit", post(student::submit_attempt))
        .route("/:attempt_id/proctor", post(student::record_proctor_event))
        // Review endpoints
        .route("/:attempt_id/events", get(faculty::list_proctor_events))
        .route("/exam/:exam_id", get(faculty::list_exam_attempts))
        .route("/exam/:exam_id/grant-retake", post(faculty::grant_retake))
}

#[cfg(test)]
mod tests;
