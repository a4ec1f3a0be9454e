use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use quiz_core::model::{
    AnswerKey, LeaderboardEntry, Question, QuestionId, QuizResult, ScoreSubmission,
};

use super::progress::{AnswerFeedback, QuizProgress};
use super::session::{QuizSession, QuizStatus, SubmissionState};
use crate::Clock;
use crate::backend::{QuestionRequest, QuizBackend};
use crate::config::QuizConfig;
use crate::error::{BackendError, QuizError};

/// Outcome of [`QuizEngine::advance_or_end`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Moved { index: usize },
    Ended(QuizResult),
}

/// Runs one quiz session at a time against a `QuizBackend`.
///
/// Clones share the same session and clock. No lock is held across an
/// `.await`; async responses are matched against the session generation they
/// were started under.
#[derive(Clone)]
pub struct QuizEngine {
    backend: Arc<dyn QuizBackend>,
    clock: Arc<Mutex<Clock>>,
    config: QuizConfig,
    username: String,
    session: Arc<Mutex<QuizSession>>,
}

impl QuizEngine {
    #[must_use]
    pub fn new(backend: Arc<dyn QuizBackend>, config: QuizConfig) -> Self {
        let username = config.resolve_username();
        Self {
            backend,
            clock: Arc::new(Mutex::new(Clock::default())),
            config,
            username,
            session: Arc::new(Mutex::new(QuizSession::new())),
        }
    }

    #[must_use]
    pub fn with_clock(self, clock: Clock) -> Self {
        self.with_shared_clock(Arc::new(Mutex::new(clock)))
    }

    /// Read time from a clock the caller keeps a handle to.
    #[must_use]
    pub fn with_shared_clock(mut self, clock: Arc<Mutex<Clock>>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Load a fresh question set and begin the quiz.
    ///
    /// Returns `Ok(false)` when a later start or a reset superseded this call
    /// while it was waiting on the backend; the session is left to the newer call.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` while a quiz is in progress, and
    /// `QuizError::Validation` or `QuizError::Fetch` when loading fails (the
    /// session then sits in `Error`).
    pub async fn start_quiz(&self) -> Result<bool, QuizError> {
        let generation = self.lock().begin_loading()?;

        let loaded = match self.config.validate() {
            Ok(()) => self.load(&self.config.question_request()).await,
            Err(err) => Err(err.into()),
        };

        match loaded {
            Ok((questions, key)) => {
                let started_at = self.now();
                let applied = self
                    .lock()
                    .finish_loading(generation, questions, key, started_at);
                if !applied {
                    log::debug!("dropping stale questions for generation {}", generation.value());
                }
                Ok(applied)
            }
            Err(err) => {
                if self.lock().fail_loading(generation, err.to_string()) {
                    log::warn!("quiz failed to start: {err}");
                    Err(err)
                } else {
                    log::debug!("dropping stale failure for generation {}", generation.value());
                    Ok(false)
                }
            }
        }
    }

    async fn load(&self, request: &QuestionRequest) -> Result<(Vec<Question>, AnswerKey), QuizError> {
        let questions = self
            .backend
            .fetch_questions(request)
            .await
            .map_err(QuizError::from_fetch)?;
        if questions.is_empty() {
            return Err(QuizError::Fetch(BackendError::EmptyResponse));
        }

        let mut seen = HashSet::with_capacity(questions.len());
        if let Some(dup) = questions.iter().map(Question::id).find(|id| !seen.insert(*id)) {
            return Err(QuizError::Fetch(BackendError::DuplicateQuestion(dup.clone())));
        }

        let ids: Vec<QuestionId> = questions.iter().map(|q| q.id().clone()).collect();
        let key = self
            .backend
            .fetch_answer_key(&ids)
            .await
            .map_err(QuizError::from_fetch)?;
        let missing = ids.iter().filter(|id| !key.contains(id)).count();
        if missing > 0 {
            return Err(QuizError::Fetch(BackendError::IncompleteAnswerKey { missing }));
        }
        Ok((questions, key))
    }

    /// Record or overwrite an answer. `Ok(false)` for ids outside the loaded set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` unless the quiz is in progress.
    pub fn answer_question(
        &self,
        question_id: &QuestionId,
        option: impl Into<String>,
    ) -> Result<bool, QuizError> {
        self.lock().answer_question(question_id, option)
    }

    pub fn go_to_next_question(&self) -> bool {
        self.lock().go_to_next_question()
    }

    pub fn go_to_question(&self, index: usize) -> bool {
        self.lock().go_to_question(index)
    }

    /// Move on, or end the quiz when the current question is the last one.
    ///
    /// Ending does not submit; call [`QuizEngine::submit_result`] afterwards.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` unless the quiz is in progress.
    pub fn advance_or_end(&self) -> Result<Advance, QuizError> {
        let mut session = self.lock();
        if session.status() != QuizStatus::InProgress {
            return Err(QuizError::InvalidState {
                operation: "advance",
                status: session.status(),
            });
        }
        if session.go_to_next_question() {
            return Ok(Advance::Moved {
                index: session.current_index(),
            });
        }
        Ok(Advance::Ended(session.end(self.now())?))
    }

    /// Grade the run and enter `Ended`. The result is final as soon as this
    /// returns; the submission stays pending until [`QuizEngine::submit_result`].
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` unless the quiz is in progress.
    pub fn end_quiz(&self) -> Result<QuizResult, QuizError> {
        let ended_at = self.now();
        self.lock().end(ended_at)
    }

    /// Send the result of the ended session to the backend.
    ///
    /// The outcome is recorded in the session's `SubmissionState` unless a
    /// reset or a new start happened meanwhile. Failure never touches the result.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` when no submission is pending, and
    /// `QuizError::Submission` when the backend rejects or cannot store it.
    pub async fn submit_result(&self) -> Result<LeaderboardEntry, QuizError> {
        let (generation, result) = {
            let session = self.lock();
            match (session.submission(), session.result()) {
                (SubmissionState::Pending, Some(result)) => (session.generation(), result.clone()),
                _ => {
                    return Err(QuizError::InvalidState {
                        operation: "submit the result",
                        status: session.status(),
                    });
                }
            }
        };

        let submission = match ScoreSubmission::from_result(&self.username, &result) {
            Ok(submission) => self
                .backend
                .submit_result(&submission)
                .await
                .map_err(QuizError::Submission),
            Err(err) => Err(QuizError::Submission(err.into())),
        };

        match &submission {
            Ok(entry) => {
                self.lock().submission_succeeded(generation, entry.clone());
            }
            Err(err) => {
                log::error!("score submission failed: {err}");
                self.lock().submission_failed(generation, err.to_string());
            }
        }
        submission
    }

    pub fn reset_quiz(&self) {
        self.lock().reset();
    }

    //
    // ─── SNAPSHOTS ─────────────────────────────────────────────────────────────
    //

    /// A copy of the current session state.
    #[must_use]
    pub fn session(&self) -> QuizSession {
        self.lock().clone()
    }

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.lock().status()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        self.lock().current_question().cloned()
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        self.lock().progress()
    }

    #[must_use]
    pub fn feedback(&self, question_id: &QuestionId) -> Option<AnswerFeedback> {
        self.lock().feedback(question_id)
    }

    #[must_use]
    pub fn result(&self) -> Option<QuizResult> {
        self.lock().result().cloned()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .now()
    }

    fn lock(&self) -> MutexGuard<'_, QuizSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
