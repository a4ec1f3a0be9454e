use std::env;

use quiz_core::model::{Difficulty, normalize_username};
use rand::Rng;

use crate::backend::QuestionRequest;
use crate::error::ConfigError;

pub const DEFAULT_QUESTION_COUNT: u32 = 10;
pub const MAX_QUESTION_COUNT: u32 = 50;
pub const DEFAULT_QUESTION_DURATION_SECS: u32 = 30;

/// Settings supplied to the quiz engine when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizConfig {
    pub question_count: u32,
    pub question_duration_secs: u32,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub username: Option<String>,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            question_count: DEFAULT_QUESTION_COUNT,
            question_duration_secs: DEFAULT_QUESTION_DURATION_SECS,
            category: None,
            difficulty: None,
            username: None,
        }
    }
}

impl QuizConfig {
    /// Read `QUIZ_QUESTIONS`, `QUIZ_DURATION`, `QUIZ_CATEGORY`, `QUIZ_DIFFICULTY`
    /// and `QUIZ_USERNAME`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`QuizConfig::from_env`] with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is set but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("QUIZ_QUESTIONS") {
            config.question_count = parse_u32("QUIZ_QUESTIONS", &raw)?;
        }
        if let Some(raw) = get("QUIZ_DURATION") {
            config.question_duration_secs = parse_u32("QUIZ_DURATION", &raw)?;
        }
        config.category = get("QUIZ_CATEGORY").map(|c| c.trim().to_owned());
        if let Some(raw) = get("QUIZ_DIFFICULTY") {
            config.difficulty = Some(parse_difficulty("QUIZ_DIFFICULTY", &raw)?);
        }
        config.username = get("QUIZ_USERNAME");

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_question_count(mut self, count: u32) -> Self {
        self.question_count = count;
        self
    }

    #[must_use]
    pub fn with_question_duration_secs(mut self, secs: u32) -> Self {
        self.question_duration_secs = secs;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Option<Difficulty>) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// # Errors
    ///
    /// Returns the first out-of-range setting as a `ConfigError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_QUESTION_COUNT).contains(&self.question_count) {
            return Err(ConfigError::InvalidQuestionCount {
                value: self.question_count,
                max: MAX_QUESTION_COUNT,
            });
        }
        if self.question_duration_secs == 0 {
            return Err(ConfigError::InvalidDuration);
        }
        if let Some(name) = &self.username {
            normalize_username(name).map_err(|e| ConfigError::InvalidUsername(e.to_string()))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn question_request(&self) -> QuestionRequest {
        QuestionRequest {
            count: self.question_count,
            category: self.category.clone(),
            difficulty: self.difficulty,
        }
    }

    /// The configured username, or a generated `Player<NNNN>` name.
    #[must_use]
    pub fn resolve_username(&self) -> String {
        match &self.username {
            Some(name) => name.trim().to_owned(),
            None => format!("Player{}", rand::rng().random_range(0..10_000)),
        }
    }
}

pub(crate) fn parse_u32(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        raw: raw.to_owned(),
    })
}

pub(crate) fn parse_difficulty(key: &'static str, raw: &str) -> Result<Difficulty, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        raw: raw.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = QuizConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, QuizConfig::default());
        assert_eq!(config.question_count, 10);
        assert_eq!(config.question_duration_secs, 30);
    }

    #[test]
    fn reads_all_values() {
        let config = QuizConfig::from_lookup(lookup(&[
            ("QUIZ_QUESTIONS", "5"),
            ("QUIZ_DURATION", "15"),
            ("QUIZ_CATEGORY", " Science "),
            ("QUIZ_DIFFICULTY", "hard"),
            ("QUIZ_USERNAME", "ana"),
        ]))
        .unwrap();
        assert_eq!(config.question_count, 5);
        assert_eq!(config.question_duration_secs, 15);
        assert_eq!(config.category.as_deref(), Some("Science"));
        assert_eq!(config.difficulty, Some(Difficulty::Hard));
        assert_eq!(config.resolve_username(), "ana");
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = QuizConfig::from_lookup(lookup(&[("QUIZ_QUESTIONS", "51")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidQuestionCount { value: 51, max: 50 }
        );

        let err = QuizConfig::from_lookup(lookup(&[("QUIZ_DURATION", "0")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidDuration);

        let err = QuizConfig::from_lookup(lookup(&[("QUIZ_QUESTIONS", "ten")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "QUIZ_QUESTIONS", .. }));
    }

    #[test]
    fn generates_player_name_when_missing() {
        let name = QuizConfig::default().resolve_username();
        assert!(name.starts_with("Player"));
        assert!(name["Player".len()..].parse::<u32>().unwrap() < 10_000);
    }
}
