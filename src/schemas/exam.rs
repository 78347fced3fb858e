use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

pub(crate) use crate::core::time::format_primitive;
use crate::db::models::{AssignmentCriteria, Exam, Question};
use crate::db::types::QuestionKind;

#[derive(Debug, Deserialize)]
pub(crate) struct WindowPayload {
    #[serde(deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) start: OffsetDateTime,
    #[serde(deserialize_with = "deserialize_offset_datetime_flexible")]
    pub(crate) end: OffsetDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "durationMins", alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    pub(crate) window: WindowPayload,
    #[serde(default)]
    pub(crate) questions: Vec<Question>,
    #[serde(default, alias = "assignmentCriteria")]
    pub(crate) assignment_criteria: AssignmentCriteria,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ExamUpdate {
    #[serde(default)]
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "durationMins", alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default)]
    pub(crate) window: Option<WindowPayload>,
    #[serde(default)]
    pub(crate) questions: Option<Vec<Question>>,
    #[serde(default, alias = "assignmentCriteria")]
    pub(crate) assignment_criteria: Option<AssignmentCriteria>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WindowResponse {
    pub(crate) start: String,
    pub(crate) end: String,
}

/// Full exam view, answer keys included. Faculty-only.
#[derive(Debug, Serialize)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) window: WindowResponse,
    pub(crate) questions: Vec<Question>,
    pub(crate) assignment_criteria: AssignmentCriteria,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            duration_minutes: exam.duration_minutes,
            window: WindowResponse {
                start: format_primitive(exam.window_start),
                end: format_primitive(exam.window_end),
            },
            questions: exam.questions.0,
            assignment_criteria: exam.assignment_criteria.0,
            created_by: exam.created_by,
            created_at: format_primitive(exam.created_at),
            updated_at: format_primitive(exam.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SanitizedQuestion {
    #[serde(rename = "type")]
    pub(crate) kind: QuestionKind,
    pub(crate) text: String,
    pub(crate) options: Vec<String>,
    pub(crate) points: f64,
}

/// What a student taking the exam is allowed to see: no answer keys, and no
/// options on free-text questions.
#[derive(Debug, Serialize)]
pub(crate) struct SanitizedExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) window: WindowResponse,
    pub(crate) questions: Vec<SanitizedQuestion>,
}

impl SanitizedExamResponse {
    pub(crate) fn from_db(exam: Exam) -> Self {
        let questions = exam
            .questions
            .0
            .into_iter()
            .map(|question| SanitizedQuestion {
                kind: question.kind,
                text: question.text,
                options: if question.kind == QuestionKind::Text {
                    Vec::new()
                } else {
                    question.options
                },
                points: question.points,
            })
            .collect();

        Self {
            id: exam.id,
            title: exam.title,
            description: exam.description,
            duration_minutes: exam.duration_minutes,
            window: WindowResponse {
                start: format_primitive(exam.window_start),
                end: format_primitive(exam.window_end),
            },
            questions,
        }
    }
}

/// Derived availability of an exam in the student listing. Terminal attempt
/// states are re-labeled `not-started` while an unspent retake grant exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum AvailabilityStatus {
    NotStarted,
    InProgress,
    Submitted,
    Invalid,
}

#[derive(Debug, Serialize)]
pub(crate) struct AvailableExamResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) window: WindowResponse,
    pub(crate) status: AvailabilityStatus,
}

fn parse_offset_datetime_flexible(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(value);
    }

    // datetime-local inputs often arrive without timezone.
    if raw.len() == 16 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}:00Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if raw.len() == 19 && raw.as_bytes().get(10) == Some(&b'T') {
        let candidate = format!("{raw}Z");
        if let Ok(value) = OffsetDateTime::parse(&candidate, &Rfc3339) {
            return Some(value);
        }
    }

    if let Ok(value) =
        PrimitiveDateTime::parse(raw, &format_description!("[year]-[month]-[day]T[hour]:[minute]"))
    {
        return Some(value.assume_utc());
    }
    if let Ok(value) = PrimitiveDateTime::parse(
        raw,
        &format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    ) {
        return Some(value.assume_utc());
    }

    None
}

fn deserialize_offset_datetime_flexible<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_offset_datetime_flexible(&raw)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}
