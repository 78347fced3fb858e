use std::collections::{BTreeSet, HashMap};

use crate::db::models::{Answer, AnswerValue, Question};
use crate::db::types::QuestionKind;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreOutcome {
    pub(crate) total: f64,
    pub(crate) manual_needed: bool,
}

/// Computes the automatic score of an answer set against a question list.
///
/// Free-text questions contribute nothing and flag the attempt for manual
/// grading, so the returned total is a lower bound for such attempts.
/// Answers of the wrong shape for their question score zero; nothing here
/// can fail.
pub(crate) fn score(questions: &[Question], answers: &[Answer]) -> ScoreOutcome {
    let by_index: HashMap<i64, &AnswerValue> =
        answers.iter().map(|answer| (answer.question_index, &answer.value)).collect();

    let mut total = 0.0;
    let mut manual_needed = false;

    for (idx, question) in questions.iter().enumerate() {
        let given = by_index.get(&(idx as i64)).copied();

        match question.kind {
            QuestionKind::Text => {
                manual_needed = true;
            }
            QuestionKind::Single => {
                if let (Some(AnswerValue::Choice(picked)), [correct]) =
                    (given, question.correct_answers.as_slice())
                {
                    if picked == correct {
                        total += question.points;
                    }
                }
            }
            QuestionKind::Mcq => {
                if let Some(AnswerValue::Choices(picked)) = given {
                    let picked: BTreeSet<i64> = picked.iter().copied().collect();
                    let correct: BTreeSet<i64> =
                        question.correct_answers.iter().copied().collect();
                    if picked == correct {
                        total += question.points;
                    }
                }
            }
        }
    }

    ScoreOutcome { total, manual_needed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(correct: i64, points: f64) -> Question {
        Question {
            kind: QuestionKind::Single,
            text: "pick one".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct_answers: vec![correct],
            points,
        }
    }

    fn mcq(correct: &[i64], points: f64) -> Question {
        Question {
            kind: QuestionKind::Mcq,
            text: "pick all".to_string(),
            options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct_answers: correct.to_vec(),
            points,
        }
    }

    fn text(points: f64) -> Question {
        Question {
            kind: QuestionKind::Text,
            text: "explain".to_string(),
            options: Vec::new(),
            correct_answers: Vec::new(),
            points,
        }
    }

    fn answer(index: i64, value: AnswerValue) -> Answer {
        Answer { question_index: index, value }
    }

    #[test]
    fn single_plus_text_scores_objective_and_flags_manual() {
        let questions = vec![single(1, 5.0), text(1.0)];
        let answers = vec![
            answer(0, AnswerValue::Choice(1)),
            answer(1, AnswerValue::FreeText("hello".to_string())),
        ];

        let outcome = score(&questions, &answers);
        assert_eq!(outcome.total, 5.0);
        assert!(outcome.manual_needed);
    }

    #[test]
    fn mcq_set_equality_is_order_independent() {
        let questions = vec![mcq(&[0, 2], 3.0)];

        let full = vec![answer(0, AnswerValue::Choices(vec![2, 0]))];
        assert_eq!(score(&questions, &full).total, 3.0);

        let incomplete = vec![answer(0, AnswerValue::Choices(vec![0]))];
        assert_eq!(score(&questions, &incomplete).total, 0.0);

        let superset = vec![answer(0, AnswerValue::Choices(vec![0, 1, 2]))];
        assert_eq!(score(&questions, &superset).total, 0.0);
    }

    #[test]
    fn wrong_shapes_and_missing_answers_score_zero() {
        let questions = vec![single(0, 2.0), mcq(&[1], 2.0)];
        let answers = vec![
            // array given to a single-choice question
            answer(0, AnswerValue::Choices(vec![0])),
            // scalar given to a multi-select question
            answer(1, AnswerValue::Choice(1)),
            // answer for a question index that does not exist
            answer(7, AnswerValue::Choice(0)),
        ];

        let outcome = score(&questions, &answers);
        assert_eq!(outcome.total, 0.0);
        assert!(!outcome.manual_needed);
    }

    #[test]
    fn scoring_is_pure_and_repeatable() {
        let questions = vec![single(1, 5.0), mcq(&[0, 1], 2.5), text(1.0)];
        let answers = vec![
            answer(0, AnswerValue::Choice(1)),
            answer(1, AnswerValue::Choices(vec![1, 0])),
            answer(2, AnswerValue::FreeText("essay".to_string())),
        ];

        let first = score(&questions, &answers);
        let second = score(&questions, &answers);
        assert_eq!(first, second);
        assert_eq!(first.total, 7.5);
        assert!(first.manual_needed);
    }

    #[test]
    fn unanswered_paper_scores_zero() {
        let questions = vec![single(0, 4.0), mcq(&[0], 4.0)];
        let outcome = score(&questions, &[]);
        assert_eq!(outcome.total, 0.0);
        assert!(!outcome.manual_needed);
    }
}
