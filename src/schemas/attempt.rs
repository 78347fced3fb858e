use serde::{Deserialize, Serialize};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{Answer, Attempt};
use crate::db::types::{AttemptStatus, ViolationKind};
use crate::schemas::exam::SanitizedExamResponse;

#[derive(Debug, Deserialize)]
pub(crate) struct StartAttemptRequest {
    #[serde(alias = "examId")]
    pub(crate) exam_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) server_start_time: String,
    pub(crate) server_end_time: String,
    pub(crate) duration_minutes: i32,
    pub(crate) exam: SanitizedExamResponse,
}

/// Raw autosave payload. Entries are coerced into typed answers at the save
/// boundary; anything malformed is dropped there, not rejected.
#[derive(Debug, Deserialize)]
pub(crate) struct SaveAnswersRequest {
    pub(crate) answers: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveAnswersResponse {
    pub(crate) ok: bool,
    pub(crate) saved_answers: usize,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResponse {
    pub(crate) score: f64,
    pub(crate) manual_needed: bool,
    pub(crate) submitted_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) answers: Vec<Answer>,
    pub(crate) score: f64,
    pub(crate) manual_needed: bool,
    pub(crate) violation_count: i32,
    pub(crate) last_violation_at: Option<String>,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            exam_id: attempt.exam_id,
            student_id: attempt.student_id,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            answers: attempt.answers.0,
            score: attempt.score,
            manual_needed: attempt.manual_needed,
            violation_count: attempt.violation_count,
            last_violation_at: attempt.last_violation_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProctorEventRequest {
    #[serde(rename = "type")]
    pub(crate) kind: ViolationKind,
    #[serde(default)]
    pub(crate) meta: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProctorEventResponse {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    #[serde(rename = "type")]
    pub(crate) kind: ViolationKind,
    pub(crate) occurred_at: String,
    pub(crate) meta: serde_json::Value,
}

/// Faculty review row: one attempt with its student and violation summary.
#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummaryResponse {
    pub(crate) id: String,
    pub(crate) student_id: String,
    pub(crate) student_email: String,
    pub(crate) student_name: String,
    pub(crate) status: AttemptStatus,
    pub(crate) score: f64,
    pub(crate) manual_needed: bool,
    pub(crate) started_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) violations_count: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct GrantRetakeRequest {
    #[serde(alias = "studentId")]
    pub(crate) student_id: String,
    #[serde(default = "default_grant_count")]
    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub(crate) count: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct GrantRetakeResponse {
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) remaining: i32,
}

fn default_grant_count() -> i32 {
    1
}
