use std::collections::HashMap;

use sqlx::PgPool;

use crate::api::errors::ApiError;
pub(crate) use crate::core::time::primitive_now_utc as now_primitive;
use crate::db::models::{Answer, Attempt, Exam};
use crate::repositories;

/// Owner-scoped attempt fetch; anyone else's attempt reads as missing.
pub(crate) async fn fetch_owned_attempt(
    pool: &PgPool,
    attempt_id: &str,
    student_id: &str,
) -> Result<Attempt, ApiError> {
    repositories::attempts::find_owned(pool, attempt_id, student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch attempt"))?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))
}

/// An attempt row always references a live exam (deletes cascade), so a
/// missing exam here is a storage fault, not a caller error.
pub(crate) async fn fetch_attempt_exam(pool: &PgPool, exam_id: &str) -> Result<Exam, ApiError> {
    repositories::exams::find_by_id(pool, exam_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam"))?
        .ok_or_else(|| ApiError::Internal("Exam missing for attempt".to_string()))
}

/// Coerces raw autosave entries into typed answers. Entries without a
/// numeric question index or with a value that fits no answer shape are
/// dropped without complaint.
pub(crate) fn parse_answer_patches(raw: Vec<serde_json::Value>) -> Vec<Answer> {
    raw.into_iter()
        .filter_map(|entry| serde_json::from_value::<Answer>(entry).ok())
        .collect()
}

/// Last-write-wins merge keyed by question index. Indices absent from the
/// patch keep their previous value; first-seen order is preserved.
pub(crate) fn merge_answers(existing: Vec<Answer>, patches: Vec<Answer>) -> Vec<Answer> {
    let mut merged = existing;
    let mut positions: HashMap<i64, usize> = merged
        .iter()
        .enumerate()
        .map(|(position, answer)| (answer.question_index, position))
        .collect();

    for patch in patches {
        match positions.get(&patch.question_index) {
            Some(&position) => merged[position] = patch,
            None => {
                positions.insert(patch.question_index, merged.len());
                merged.push(patch);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::AnswerValue;
    use serde_json::json;

    fn answer(index: i64, value: AnswerValue) -> Answer {
        Answer { question_index: index, value }
    }

    #[test]
    fn parse_drops_entries_with_non_numeric_index() {
        let parsed = parse_answer_patches(vec![
            json!({"question_index": 0, "value": 1}),
            json!({"question_index": "zero", "value": 1}),
            json!({"value": 2}),
            json!({"question_index": 2, "value": [0, 1]}),
        ]);

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].question_index, 0);
        assert_eq!(parsed[0].value, AnswerValue::Choice(1));
        assert_eq!(parsed[1].question_index, 2);
        assert_eq!(parsed[1].value, AnswerValue::Choices(vec![0, 1]));
    }

    #[test]
    fn parse_drops_values_that_fit_no_shape() {
        let parsed = parse_answer_patches(vec![
            json!({"question_index": 0, "value": {"nested": true}}),
            json!({"question_index": 1, "value": "free text"}),
        ]);

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].value, AnswerValue::FreeText("free text".to_string()));
    }

    #[test]
    fn parse_accepts_camel_case_index() {
        let parsed = parse_answer_patches(vec![json!({"questionIndex": 3, "value": 1})]);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].question_index, 3);
    }

    #[test]
    fn merge_overwrites_same_index_and_keeps_the_rest() {
        let existing = vec![
            answer(0, AnswerValue::Choice(1)),
            answer(1, AnswerValue::FreeText("draft".to_string())),
        ];
        let patches = vec![
            answer(1, AnswerValue::FreeText("final".to_string())),
            answer(2, AnswerValue::Choices(vec![0])),
        ];

        let merged = merge_answers(existing, patches);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].value, AnswerValue::Choice(1));
        assert_eq!(merged[1].value, AnswerValue::FreeText("final".to_string()));
        assert_eq!(merged[2].question_index, 2);
    }

    #[test]
    fn merge_with_empty_patch_is_identity() {
        let existing = vec![answer(0, AnswerValue::Choice(1))];
        let merged = merge_answers(existing.clone(), Vec::new());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value, existing[0].value);
    }
}
