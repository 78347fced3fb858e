use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, QuestionKind, UserRole, ViolationKind};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) college: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) section: Option<i32>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// One authored question, stored inside the exam's `questions` JSONB column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Question {
    #[serde(rename = "type")]
    pub(crate) kind: QuestionKind,
    pub(crate) text: String,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctAnswers")]
    pub(crate) correct_answers: Vec<i64>,
    #[serde(default = "default_points")]
    pub(crate) points: f64,
}

/// Who an exam is assigned to. Every field is optional; unset means
/// unrestricted on that axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct AssignmentCriteria {
    #[serde(default)]
    pub(crate) college: Option<String>,
    #[serde(default)]
    pub(crate) year: Vec<i32>,
    #[serde(default)]
    pub(crate) department: Vec<String>,
    #[serde(default)]
    pub(crate) section: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Exam {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) window_start: PrimitiveDateTime,
    pub(crate) window_end: PrimitiveDateTime,
    pub(crate) questions: Json<Vec<Question>>,
    pub(crate) assignment_criteria: Json<AssignmentCriteria>,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A student's answer to one question. The value shape depends on the
/// question type; anything that fits none of the shapes is discarded at the
/// save boundary, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum AnswerValue {
    Choice(i64),
    Choices(Vec<i64>),
    FreeText(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Answer {
    #[serde(alias = "questionIndex")]
    pub(crate) question_index: i64,
    pub(crate) value: AnswerValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) exam_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Json<Vec<Answer>>,
    pub(crate) score: f64,
    pub(crate) manual_needed: bool,
    pub(crate) violation_count: i32,
    pub(crate) last_violation_at: Option<PrimitiveDateTime>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ProctorEvent {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) kind: ViolationKind,
    pub(crate) occurred_at: PrimitiveDateTime,
    pub(crate) meta: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
}

fn default_points() -> f64 {
    1.0
}
