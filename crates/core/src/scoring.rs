//! Scoring of a quiz run against an answer key.

use crate::model::{AnswerKey, Answers, QuestionId};

/// Outcome of grading a set of answers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub correct: u32,
    pub total: u32,
    pub percentage: f64,
}

/// Returns true when `selected` is the correct option for `question_id`.
///
/// Unknown question ids are never correct.
#[must_use]
pub fn validate_answer(question_id: &QuestionId, selected: &str, key: &AnswerKey) -> bool {
    key.get(question_id) == Some(selected)
}

/// Grade `answers` against `key`.
///
/// `total` counts the entries of the key, not the answers: unanswered questions
/// count against the score while answers to unknown ids are ignored.
#[must_use]
pub fn calculate_score(answers: &Answers, key: &AnswerKey) -> ScoreBreakdown {
    let correct = answers
        .iter()
        .filter(|(id, selected)| validate_answer(id, selected, key))
        .count();

    let correct = u32::try_from(correct).unwrap_or(u32::MAX);
    let total = u32::try_from(key.len()).unwrap_or(u32::MAX);
    let percentage = if total > 0 {
        f64::from(correct) / f64::from(total) * 100.0
    } else {
        0.0
    };

    ScoreBreakdown {
        correct,
        total,
        percentage,
    }
}
