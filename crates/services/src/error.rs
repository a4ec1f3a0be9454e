//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, QuestionId, ScoreError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::quiz::QuizStatus;

/// Errors emitted by a `QuizBackend` implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("{0}")]
    Validation(String),
    #[error("backend returned an empty response")]
    EmptyResponse,
    #[error("backend returned question {0} more than once")]
    DuplicateQuestion(QuestionId),
    #[error("answer key is missing {missing} of the loaded questions")]
    IncompleteAnswerKey { missing: usize },
    #[error("backend request failed with status {status}: {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("backend returned invalid data: {0}")]
    InvalidData(#[from] quiz_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ScoreError> for BackendError {
    fn from(err: ScoreError) -> Self {
        BackendError::Validation(err.to_string())
    }
}

/// Errors emitted by the quiz engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    /// Question retrieval failed (network or server side).
    #[error("failed to fetch questions: {0}")]
    Fetch(#[source] BackendError),
    /// Malformed or out-of-range request, e.g. a bad question count.
    #[error("invalid quiz request: {0}")]
    Validation(String),
    /// Writing the score failed. Never hides the local result.
    #[error("failed to submit score: {0}")]
    Submission(#[source] BackendError),
    #[error("cannot {operation} while the quiz is {status}")]
    InvalidState {
        operation: &'static str,
        status: QuizStatus,
    },
}

impl QuizError {
    /// Classify a backend failure that happened while loading a quiz.
    #[must_use]
    pub fn from_fetch(err: BackendError) -> Self {
        match err {
            BackendError::Validation(message) => QuizError::Validation(message),
            other => QuizError::Fetch(other),
        }
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("question count must be between 1 and {max}, got {value}")]
    InvalidQuestionCount { value: u32, max: u32 },
    #[error("question duration must be at least 1 second")]
    InvalidDuration,
    #[error("invalid username: {0}")]
    InvalidUsername(String),
    #[error("invalid value for {key}: {raw}")]
    InvalidValue { key: &'static str, raw: String },
}

impl From<ConfigError> for QuizError {
    fn from(err: ConfigError) -> Self {
        QuizError::Validation(err.to_string())
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid sample question: {0}")]
    Seed(#[from] QuestionError),
}
