use std::sync::Arc;

use async_trait::async_trait;

use quiz_core::model::{
    AnswerKey, AnsweredQuestion, LeaderboardEntry, Question, QuestionId, ScoreSubmission,
};
use storage::repository::{QuestionFilter, QuestionRepository, ScoreRepository, Storage};

use super::{QuestionRequest, QuizBackend, validate_leaderboard_limit};
use crate::Clock;
use crate::error::BackendError;

/// Backend served directly from local repositories.
#[derive(Clone)]
pub struct LocalBackend {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    scores: Arc<dyn ScoreRepository>,
}

impl LocalBackend {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        scores: Arc<dyn ScoreRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            scores,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.scores),
        )
    }
}

#[async_trait]
impl QuizBackend for LocalBackend {
    async fn fetch_questions(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<Question>, BackendError> {
        request.validate()?;
        let filter = QuestionFilter {
            category: request.category.clone(),
            difficulty: request.difficulty,
        };
        let drawn = self
            .questions
            .sample_questions(&filter, request.count)
            .await?;
        log::debug!("drew {} of {} requested questions", drawn.len(), request.count);
        Ok(drawn.into_iter().map(AnsweredQuestion::into_question).collect())
    }

    async fn fetch_answer_key(&self, ids: &[QuestionId]) -> Result<AnswerKey, BackendError> {
        let found = self.questions.get_questions(ids).await?;
        Ok(found.iter().collect())
    }

    async fn submit_result(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<LeaderboardEntry, BackendError> {
        submission.validate()?;
        let entry = self
            .scores
            .append_score(submission, self.clock.now())
            .await?;
        log::info!(
            "stored score {}/{} for {}",
            entry.score,
            entry.total_questions,
            entry.username
        );
        Ok(entry)
    }

    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, BackendError> {
        validate_leaderboard_limit(limit)?;
        Ok(self.scores.top_scores(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::seed::{replace_questions, sample_questions};

    async fn seeded() -> (Storage, LocalBackend) {
        let storage = Storage::in_memory();
        replace_questions(storage.questions.as_ref(), &sample_questions().unwrap())
            .await
            .unwrap();
        let backend = LocalBackend::from_storage(fixed_clock(), &storage);
        (storage, backend)
    }

    #[tokio::test]
    async fn questions_come_without_answers_and_key_matches() {
        let (_storage, backend) = seeded().await;
        let questions = backend
            .fetch_questions(&QuestionRequest::new(4))
            .await
            .unwrap();
        assert_eq!(questions.len(), 4);

        let ids: Vec<_> = questions.iter().map(|q| q.id().clone()).collect();
        let key = backend.fetch_answer_key(&ids).await.unwrap();
        assert_eq!(key.len(), 4);
        for question in &questions {
            let correct = key.get(question.id()).unwrap();
            assert!(question.has_option(correct));
        }
    }

    #[tokio::test]
    async fn rejects_out_of_range_requests() {
        let (_storage, backend) = seeded().await;
        let err = backend
            .fetch_questions(&QuestionRequest::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)));

        let err = backend.fetch_leaderboard(101).await.unwrap_err();
        assert!(matches!(err, BackendError::Validation(_)));
    }

    #[tokio::test]
    async fn submission_is_validated_and_ranked() {
        let (_storage, backend) = seeded().await;
        let bad = ScoreSubmission {
            username: String::new(),
            score: 1,
            total_questions: 2,
            percentage: 50.0,
            time_taken_secs: 10,
        };
        assert!(matches!(
            backend.submit_result(&bad).await,
            Err(BackendError::Validation(_))
        ));

        let good = ScoreSubmission {
            username: "ana".into(),
            ..bad
        };
        let entry = backend.submit_result(&good).await.unwrap();
        assert_eq!(entry.submitted_at, fixed_now());

        let board = backend.fetch_leaderboard(10).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].username, "ana");
    }
}
