use time::PrimitiveDateTime;

use crate::db::models::Question;
use crate::db::types::QuestionKind;

/// Checks an exam definition for internal consistency. All problems are
/// collected and reported together rather than failing on the first one.
pub(crate) fn validate_exam(
    window_start: PrimitiveDateTime,
    window_end: PrimitiveDateTime,
    duration_minutes: i32,
    questions: &[Question],
) -> Result<(), Vec<String>> {
    let mut problems = Vec::new();

    if window_end <= window_start {
        problems.push("exam window end must be after start".to_string());
    }
    if duration_minutes < 1 {
        problems.push("duration_minutes must be at least 1".to_string());
    }

    for (idx, question) in questions.iter().enumerate() {
        // Free-text questions carry no choice semantics; stray options or
        // answer keys on them are tolerated and ignored.
        if question.kind == QuestionKind::Text {
            continue;
        }

        if question.options.len() < 2 {
            problems.push(format!("question {idx}: choice questions need at least 2 options"));
        }

        if question.kind == QuestionKind::Single && question.correct_answers.len() != 1 {
            problems.push(format!(
                "question {idx}: single-choice questions need exactly one correct answer"
            ));
        }

        let options_len = question.options.len() as i64;
        for answer in &question.correct_answers {
            if *answer < 0 || *answer >= options_len {
                problems.push(format!(
                    "question {idx}: correct answer index {answer} is out of range"
                ));
            }
        }

        if question.points < 0.0 {
            problems.push(format!("question {idx}: points must not be negative"));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn question(kind: QuestionKind, options: usize, correct: Vec<i64>) -> Question {
        Question {
            kind,
            text: "q".to_string(),
            options: (0..options).map(|i| format!("opt {i}")).collect(),
            correct_answers: correct,
            points: 1.0,
        }
    }

    #[test]
    fn accepts_a_well_formed_exam() {
        let questions = vec![
            question(QuestionKind::Single, 3, vec![1]),
            question(QuestionKind::Mcq, 4, vec![0, 3]),
            question(QuestionKind::Text, 0, Vec::new()),
        ];

        let result = validate_exam(
            datetime!(2025-03-01 09:00:00),
            datetime!(2025-03-01 12:00:00),
            60,
            &questions,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_inverted_window() {
        let result = validate_exam(
            datetime!(2025-03-01 12:00:00),
            datetime!(2025-03-01 09:00:00),
            60,
            &[],
        );
        let problems = result.unwrap_err();
        assert!(problems.iter().any(|p| p.contains("window end")));
    }

    #[test]
    fn collects_every_question_problem() {
        let questions = vec![
            // one option, no correct answer
            question(QuestionKind::Single, 1, Vec::new()),
            // index out of range
            question(QuestionKind::Mcq, 2, vec![0, 5]),
        ];

        let problems = validate_exam(
            datetime!(2025-03-01 09:00:00),
            datetime!(2025-03-01 12:00:00),
            60,
            &questions,
        )
        .unwrap_err();

        assert!(problems.iter().any(|p| p.starts_with("question 0:") && p.contains("options")));
        assert!(problems
            .iter()
            .any(|p| p.starts_with("question 0:") && p.contains("exactly one")));
        assert!(problems.iter().any(|p| p.starts_with("question 1:") && p.contains("out of range")));
    }

    #[test]
    fn text_questions_are_exempt_from_choice_rules() {
        // A text question with leftover options/answer keys is fine.
        let mut stray = question(QuestionKind::Text, 1, vec![9]);
        stray.options = vec!["leftover".to_string()];

        let result = validate_exam(
            datetime!(2025-03-01 09:00:00),
            datetime!(2025-03-01 12:00:00),
            60,
            &[stray],
        );
        assert!(result.is_ok());
    }
}
