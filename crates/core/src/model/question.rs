use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("at least 2 options are required, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} cannot be empty")]
    EmptyOption { index: usize },

    #[error("correct answer must be one of the options")]
    UnknownCorrectAnswer,

    #[error("unsupported difficulty: {raw}")]
    InvalidDifficulty { raw: String },
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Human-facing label for display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

/// Label for an optional difficulty; questions without one render as `Unknown`.
#[must_use]
pub fn difficulty_label(difficulty: Option<Difficulty>) -> &'static str {
    difficulty.map_or("Unknown", Difficulty::label)
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(QuestionError::InvalidDifficulty { raw: s.to_owned() }),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Optional tags attached to a question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetails {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionDetails {
    #[must_use]
    pub fn new(category: Option<String>, difficulty: Option<Difficulty>) -> Self {
        let category = category
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());
        Self {
            category,
            difficulty,
        }
    }
}

/// A multiple-choice question as shown to the player.
///
/// Never carries the correct answer; see [`AnsweredQuestion`] for the stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    details: QuestionDetails,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id or text is empty, fewer than two options
    /// are given, or any option is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
        details: QuestionDetails,
    ) -> Result<Self, QuestionError> {
        if id.is_empty() {
            return Err(QuestionError::EmptyId);
        }
        let text = text.into().trim().to_owned();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }

        Ok(Self {
            id,
            text,
            options,
            details,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn details(&self) -> &QuestionDetails {
        &self.details
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.details.category.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.details.difficulty
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// A question paired with its correct answer, as held by the question bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredQuestion {
    question: Question,
    correct_answer: String,
}

impl AnsweredQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError::UnknownCorrectAnswer` if `correct_answer` is not one
    /// of the question's options.
    pub fn new(question: Question, correct_answer: impl Into<String>) -> Result<Self, QuestionError> {
        let correct_answer = correct_answer.into();
        if !question.has_option(&correct_answer) {
            return Err(QuestionError::UnknownCorrectAnswer);
        }
        Ok(Self {
            question,
            correct_answer,
        })
    }

    #[must_use]
    pub fn question(&self) -> &Question {
        &self.question
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn into_question(self) -> Question {
        self.question
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// Player selections keyed by question id. Only answered questions have entries.
pub type Answers = HashMap<QuestionId, String>;

/// Correctness oracle: question id to correct option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey(HashMap<QuestionId, String>);

impl AnswerKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: QuestionId, correct_answer: impl Into<String>) {
        self.0.insert(id, correct_answer.into());
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.0.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &str)> {
        self.0.iter().map(|(id, answer)| (id, answer.as_str()))
    }

    /// Keep only entries for the given question ids.
    #[must_use]
    pub fn restricted_to<'a>(&self, ids: impl IntoIterator<Item = &'a QuestionId>) -> Self {
        ids.into_iter()
            .filter_map(|id| self.0.get(id).map(|a| (id.clone(), a.clone())))
            .collect()
    }
}

impl FromIterator<(QuestionId, String)> for AnswerKey {
    fn from_iter<T: IntoIterator<Item = (QuestionId, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a AnsweredQuestion> for AnswerKey {
    fn from_iter<T: IntoIterator<Item = &'a AnsweredQuestion>>(iter: T) -> Self {
        iter.into_iter()
            .map(|q| (q.question().id().clone(), q.correct_answer().to_owned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn question_requires_two_options() {
        let err = Question::new(
            QuestionId::new("q1"),
            "Only one?",
            options(&["yes"]),
            QuestionDetails::default(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn question_rejects_blank_text_and_options() {
        let err = Question::new(
            QuestionId::new("q1"),
            "   ",
            options(&["a", "b"]),
            QuestionDetails::default(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);

        let err = Question::new(
            QuestionId::new("q1"),
            "Pick",
            options(&["a", " "]),
            QuestionDetails::default(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyOption { index: 1 });

        let err = Question::new(
            QuestionId::new(""),
            "Pick",
            options(&["a", "b"]),
            QuestionDetails::default(),
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::EmptyId);
    }

    #[test]
    fn answered_question_checks_correct_answer() {
        let question = Question::new(
            QuestionId::new("q1"),
            "Capital of France?",
            options(&["Paris", "London"]),
            QuestionDetails::new(Some(" Geography ".into()), Some(Difficulty::Easy)),
        )
        .unwrap();
        assert_eq!(question.category(), Some("Geography"));

        let err = AnsweredQuestion::new(question.clone(), "Rome").unwrap_err();
        assert_eq!(err, QuestionError::UnknownCorrectAnswer);

        let answered = AnsweredQuestion::new(question, "Paris").unwrap();
        let key: AnswerKey = std::iter::once(&answered).collect();
        assert_eq!(key.get(&QuestionId::new("q1")), Some("Paris"));
    }

    #[test]
    fn difficulty_parses_and_labels() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(difficulty_label(Some(Difficulty::Medium)), "Medium");
        assert_eq!(difficulty_label(None), "Unknown");
    }

    #[test]
    fn answer_key_can_be_restricted() {
        let key: AnswerKey = [
            (QuestionId::new("q1"), "a".to_owned()),
            (QuestionId::new("q2"), "b".to_owned()),
        ]
        .into_iter()
        .collect();
        let ids = [QuestionId::new("q2"), QuestionId::new("q9")];
        let narrowed = key.restricted_to(ids.iter());
        assert_eq!(narrowed.len(), 1);
        assert!(narrowed.contains(&QuestionId::new("q2")));
    }
}
