use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnsweredQuestion, Difficulty, LeaderboardEntry, QuestionId, ScoreSubmission, rank_entries,
};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Optional narrowing applied when drawing questions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionFilter {
    #[must_use]
    pub fn matches(&self, question: &AnsweredQuestion) -> bool {
        let q = question.question();
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|c| q.category().is_some_and(|qc| qc.eq_ignore_ascii_case(c)));
        let difficulty_ok = self.difficulty.is_none_or(|d| q.difficulty() == Some(d));
        category_ok && difficulty_ok
    }
}

/// Repository contract for the question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question together with its correct answer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &AnsweredQuestion) -> Result<(), StorageError>;

    /// Draw up to `limit` random questions matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn sample_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<AnsweredQuestion>, StorageError>;

    /// Fetch questions by id. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn get_questions(&self, ids: &[QuestionId])
    -> Result<Vec<AnsweredQuestion>, StorageError>;

    /// Remove every question from the bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn delete_all_questions(&self) -> Result<u64, StorageError>;

    /// Number of questions in the bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn count_questions(&self) -> Result<u64, StorageError>;
}

/// Repository contract for submitted scores.
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Append a validated score.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the score cannot be stored.
    async fn append_score(
        &self,
        submission: &ScoreSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, StorageError>;

    /// Best scores first (score descending, then time ascending).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn top_scores(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, AnsweredQuestion>>>,
    scores: Arc<Mutex<Vec<LeaderboardEntry>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            questions: Arc::new(Mutex::new(HashMap::new())),
            scores: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &AnsweredQuestion) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.question().id().clone(), question.clone());
        Ok(())
    }

    async fn sample_questions(
        &self,
        filter: &QuestionFilter,
        limit: u32,
    ) -> Result<Vec<AnsweredQuestion>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut matching: Vec<_> = guard.values().filter(|q| filter.matches(q)).cloned().collect();
        drop(guard);

        matching.shuffle(&mut rand::rng());
        matching.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(matching)
    }

    async fn get_questions(
        &self,
        ids: &[QuestionId],
    ) -> Result<Vec<AnsweredQuestion>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(ids.iter().filter_map(|id| guard.get(id).cloned()).collect())
    }

    async fn delete_all_questions(&self) -> Result<u64, StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let removed = guard.len();
        guard.clear();
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(u64::try_from(guard.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ScoreRepository for InMemoryRepository {
    async fn append_score(
        &self,
        submission: &ScoreSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, StorageError> {
        let entry = LeaderboardEntry::from_submission(submission.clone(), submitted_at);
        let mut guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(entry.clone());
        Ok(entry)
    }

    async fn top_scores(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let guard = self
            .scores
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut entries = guard.clone();
        drop(guard);

        rank_entries(&mut entries);
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }
}

/// Aggregates question and score repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub scores: Arc<dyn ScoreRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let scores: Arc<dyn ScoreRepository> = Arc::new(repo);
        Self { questions, scores }
    }
}
