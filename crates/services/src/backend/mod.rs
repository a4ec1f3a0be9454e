//! The backend collaborator: question retrieval, answer key, score persistence
//! and leaderboard ranking.

use async_trait::async_trait;

use quiz_core::model::{AnswerKey, Difficulty, LeaderboardEntry, Question, QuestionId, ScoreSubmission};

use crate::error::BackendError;

mod http;
mod local;

pub use http::{HttpBackend, HttpBackendConfig};
pub use local::LocalBackend;

/// Largest question set a backend will serve in one request.
pub const MAX_QUESTIONS_PER_REQUEST: u32 = 50;
/// Largest leaderboard page a backend will serve.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Parameters of a question-set request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    pub count: u32,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionRequest {
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            count,
            category: None,
            difficulty: None,
        }
    }

    /// # Errors
    ///
    /// Returns `BackendError::Validation` if `count` is outside `1..=50`.
    pub fn validate(&self) -> Result<(), BackendError> {
        if !(1..=MAX_QUESTIONS_PER_REQUEST).contains(&self.count) {
            return Err(BackendError::Validation(format!(
                "Limit must be between 1 and {MAX_QUESTIONS_PER_REQUEST}"
            )));
        }
        Ok(())
    }
}

/// Validate a leaderboard page size.
///
/// # Errors
///
/// Returns `BackendError::Validation` if `limit` is outside `1..=100`.
pub fn validate_leaderboard_limit(limit: u32) -> Result<(), BackendError> {
    if !(1..=MAX_LEADERBOARD_LIMIT).contains(&limit) {
        return Err(BackendError::Validation(format!(
            "Limit must be between 1 and {MAX_LEADERBOARD_LIMIT}"
        )));
    }
    Ok(())
}

/// Everything the quiz engine needs from the outside world.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Draw a question set. The response never includes correct answers.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on bad input, transport or server failures.
    async fn fetch_questions(&self, request: &QuestionRequest)
    -> Result<Vec<Question>, BackendError>;

    /// Correct options for the given questions.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on transport or server failures.
    async fn fetch_answer_key(&self, ids: &[QuestionId]) -> Result<AnswerKey, BackendError>;

    /// Store a finished run on the leaderboard.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the submission is rejected or cannot be written.
    async fn submit_result(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<LeaderboardEntry, BackendError>;

    /// Best scores, ordered by score descending then time ascending.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on bad input, transport or server failures.
    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, BackendError>;
}
