use std::fmt;

use chrono::{DateTime, Utc};

use quiz_core::model::{AnswerKey, Answers, LeaderboardEntry, Question, QuestionId, QuizResult};
use quiz_core::scoring::{calculate_score, validate_answer};
use quiz_core::time::elapsed_secs;

use super::progress::{AnswerFeedback, QuizProgress};
use crate::error::QuizError;

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuizStatus {
    #[default]
    Idle,
    Loading,
    InProgress,
    Ended,
    Error,
}

impl QuizStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuizStatus::Idle => "idle",
            QuizStatus::Loading => "loading",
            QuizStatus::InProgress => "in progress",
            QuizStatus::Ended => "ended",
            QuizStatus::Error => "in error",
        }
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token identifying one start or reset of a session.
///
/// Asynchronous responses carry the generation they were requested under and
/// are applied only while it is still current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Where the score submission of an ended session stands.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    #[default]
    NotSubmitted,
    Pending,
    Submitted(LeaderboardEntry),
    Failed(String),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State of a single quiz run.
///
/// Timestamps are passed in by the caller so the session itself stays
/// deterministic; `QuizEngine` supplies them from its `Clock`.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    status: QuizStatus,
    generation: Generation,
    questions: Vec<Question>,
    answer_key: AnswerKey,
    current_index: usize,
    answers: Answers,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    error: Option<String>,
    result: Option<QuizResult>,
    submission: SubmissionState,
}

impl QuizSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the previous run and enter `Loading`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` while a quiz is in progress.
    pub fn begin_loading(&mut self) -> Result<Generation, QuizError> {
        if self.status == QuizStatus::InProgress {
            return Err(self.invalid("start a quiz"));
        }
        let generation = self.generation.next();
        *self = Self {
            status: QuizStatus::Loading,
            generation,
            ..Self::default()
        };
        log::debug!("session {} loading", generation.value());
        Ok(generation)
    }

    /// Install a loaded question set and enter `InProgress`.
    ///
    /// `answer_key` must cover every question. Returns `false` and leaves the
    /// session untouched if `generation` is stale.
    pub fn finish_loading(
        &mut self,
        generation: Generation,
        questions: Vec<Question>,
        answer_key: AnswerKey,
        started_at: DateTime<Utc>,
    ) -> bool {
        if !self.is_current(generation, QuizStatus::Loading) {
            return false;
        }
        log::debug!(
            "session {} started with {} questions",
            generation.value(),
            questions.len()
        );
        self.answer_key = answer_key.restricted_to(questions.iter().map(Question::id));
        self.questions = questions;
        self.current_index = 0;
        self.started_at = Some(started_at);
        self.status = QuizStatus::InProgress;
        true
    }

    /// Record a loading failure and enter `Error`. Returns `false` if stale.
    pub fn fail_loading(&mut self, generation: Generation, message: impl Into<String>) -> bool {
        if !self.is_current(generation, QuizStatus::Loading) {
            return false;
        }
        self.error = Some(message.into());
        self.status = QuizStatus::Error;
        true
    }

    /// Record or overwrite the answer for `question_id`.
    ///
    /// Returns `Ok(false)` when the id is not part of the loaded set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` unless the quiz is in progress.
    pub fn answer_question(
        &mut self,
        question_id: &QuestionId,
        option: impl Into<String>,
    ) -> Result<bool, QuizError> {
        if self.status != QuizStatus::InProgress {
            return Err(self.invalid("answer a question"));
        }
        if !self.questions.iter().any(|q| q.id() == question_id) {
            log::debug!("ignoring answer for unknown question {question_id}");
            return Ok(false);
        }
        self.answers.insert(question_id.clone(), option.into());
        Ok(true)
    }

    /// Move to the next question. No-op on the last one or outside a running quiz.
    pub fn go_to_next_question(&mut self) -> bool {
        if self.status != QuizStatus::InProgress || self.is_last_question() {
            return false;
        }
        self.current_index += 1;
        true
    }

    /// Jump to `index`. No-op when out of bounds or outside a running quiz.
    pub fn go_to_question(&mut self, index: usize) -> bool {
        if self.status != QuizStatus::InProgress || index >= self.questions.len() {
            return false;
        }
        self.current_index = index;
        true
    }

    /// Grade the run and enter `Ended`. The submission becomes pending.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidState` unless the quiz is in progress.
    pub fn end(&mut self, ended_at: DateTime<Utc>) -> Result<QuizResult, QuizError> {
        if self.status != QuizStatus::InProgress {
            return Err(self.invalid("end the quiz"));
        }
        let started_at = self.started_at.unwrap_or(ended_at);
        let breakdown = calculate_score(&self.answers, &self.answer_key);
        let result = QuizResult::from_breakdown(breakdown, elapsed_secs(started_at, ended_at));

        self.ended_at = Some(ended_at);
        self.result = Some(result.clone());
        self.submission = SubmissionState::Pending;
        self.status = QuizStatus::Ended;
        log::debug!(
            "session {} ended: {}/{} in {}s",
            self.generation.value(),
            result.score,
            result.total_questions,
            result.time_taken_secs
        );
        Ok(result)
    }

    /// Returns `false` if the session moved on since the submission began.
    pub fn submission_succeeded(&mut self, generation: Generation, entry: LeaderboardEntry) -> bool {
        self.settle_submission(generation, SubmissionState::Submitted(entry))
    }

    /// Returns `false` if the session moved on since the submission began.
    pub fn submission_failed(&mut self, generation: Generation, message: impl Into<String>) -> bool {
        self.settle_submission(generation, SubmissionState::Failed(message.into()))
    }

    /// Back to `Idle`, discarding questions, answers and the result.
    pub fn reset(&mut self) {
        let generation = self.generation.next();
        *self = Self {
            generation,
            ..Self::default()
        };
        log::debug!("session reset (generation {})", generation.value());
    }

    fn settle_submission(&mut self, generation: Generation, state: SubmissionState) -> bool {
        if !self.is_current(generation, QuizStatus::Ended)
            || self.submission != SubmissionState::Pending
        {
            return false;
        }
        self.submission = state;
        true
    }

    fn is_current(&self, generation: Generation, status: QuizStatus) -> bool {
        self.generation == generation && self.status == status
    }

    fn invalid(&self, operation: &'static str) -> QuizError {
        QuizError::InvalidState {
            operation,
            status: self.status,
        }
    }

    //
    // ─── QUERIES ───────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn status(&self) -> QuizStatus {
        self.status
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, question_id: &QuestionId) -> Option<&str> {
        self.answers.get(question_id).map(String::as_str)
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn submission(&self) -> &SubmissionState {
        &self.submission
    }

    /// Every loaded question has an answer.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        !self.questions.is_empty()
            && self
                .questions
                .iter()
                .all(|q| self.answers.contains_key(q.id()))
    }

    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.questions.len();
        QuizProgress {
            total,
            answered: self
                .questions
                .iter()
                .filter(|q| self.answers.contains_key(q.id()))
                .count(),
            current_position: if total == 0 { 0 } else { self.current_index + 1 },
        }
    }

    /// How the player did on `question_id`, once it has been answered.
    #[must_use]
    pub fn feedback(&self, question_id: &QuestionId) -> Option<AnswerFeedback> {
        let selected = self.answers.get(question_id)?;
        let correct_answer = self.answer_key.get(question_id)?;
        Some(AnswerFeedback {
            question_id: question_id.clone(),
            selected: selected.clone(),
            correct_answer: correct_answer.to_owned(),
            is_correct: validate_answer(question_id, selected, &self.answer_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::QuestionDetails;
    use quiz_core::time::fixed_now;

    fn question(id: &str) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("question {id}"),
            vec!["a".into(), "b".into(), "c".into()],
            QuestionDetails::default(),
        )
        .unwrap()
    }

    fn loaded(ids: &[&str]) -> QuizSession {
        let mut session = QuizSession::new();
        let generation = session.begin_loading().unwrap();
        let questions = ids.iter().map(|id| question(id)).collect();
        let key = ids.iter().map(|id| (QuestionId::new(*id), "a".to_owned())).collect();
        assert!(session.finish_loading(generation, questions, key, fixed_now()));
        session
    }

    #[test]
    fn starts_idle() {
        let session = QuizSession::new();
        assert_eq!(session.status(), QuizStatus::Idle);
        assert!(session.current_question().is_none());
        assert_eq!(session.progress().current_position, 0);
        assert!(!session.is_completed());
    }

    #[test]
    fn loading_enters_in_progress_at_first_question() {
        let session = loaded(&["q1", "q2"]);
        assert_eq!(session.status(), QuizStatus::InProgress);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_question().unwrap().id().as_str(), "q1");
        assert_eq!(session.started_at(), Some(fixed_now()));
        assert!(session.ended_at().is_none());
    }

    #[test]
    fn cannot_start_while_in_progress() {
        let mut session = loaded(&["q1"]);
        let err = session.begin_loading().unwrap_err();
        assert!(matches!(
            err,
            QuizError::InvalidState {
                status: QuizStatus::InProgress,
                ..
            }
        ));
    }

    #[test]
    fn stale_loading_results_are_dropped() {
        let mut session = QuizSession::new();
        let first = session.begin_loading().unwrap();
        let second = session.begin_loading().unwrap();
        assert!(second > first);

        assert!(!session.finish_loading(first, vec![question("old")], AnswerKey::new(), fixed_now()));
        assert!(!session.fail_loading(first, "late failure"));
        assert_eq!(session.status(), QuizStatus::Loading);

        let key = std::iter::once((QuestionId::new("new"), "a".to_owned())).collect();
        assert!(session.finish_loading(second, vec![question("new")], key, fixed_now()));
        assert_eq!(session.questions()[0].id().as_str(), "new");
    }

    #[test]
    fn failed_loading_enters_error_with_message() {
        let mut session = QuizSession::new();
        let generation = session.begin_loading().unwrap();
        assert!(session.fail_loading(generation, "network down"));
        assert_eq!(session.status(), QuizStatus::Error);
        assert_eq!(session.error(), Some("network down"));
        assert!(session.questions().is_empty());

        // Error is a valid starting point for a retry.
        session.begin_loading().unwrap();
        assert!(session.error().is_none());
    }

    #[test]
    fn answers_overwrite_and_ignore_unknown_ids() {
        let mut session = loaded(&["q1", "q2"]);
        let q1 = QuestionId::new("q1");
        assert!(session.answer_question(&q1, "b").unwrap());
        assert!(session.answer_question(&q1, "a").unwrap());
        assert_eq!(session.answer_for(&q1), Some("a"));
        assert_eq!(session.current_index(), 0);

        assert!(!session.answer_question(&QuestionId::new("zz"), "a").unwrap());
        assert_eq!(session.answers().len(), 1);
        assert!(session.answers().keys().all(|id| id.as_str() != "zz"));
    }

    #[test]
    fn answering_outside_a_running_quiz_is_rejected() {
        let mut session = QuizSession::new();
        let err = session.answer_question(&QuestionId::new("q1"), "a").unwrap_err();
        assert!(matches!(err, QuizError::InvalidState { status: QuizStatus::Idle, .. }));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut session = loaded(&["q1", "q2", "q3"]);
        assert!(session.go_to_next_question());
        assert!(session.go_to_next_question());
        assert_eq!(session.current_index(), 2);
        assert!(session.is_last_question());
        assert!(!session.go_to_next_question());
        assert_eq!(session.current_index(), 2);

        assert!(session.go_to_question(0));
        assert_eq!(session.current_index(), 0);
        assert!(!session.go_to_question(3));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn end_computes_result_once() {
        let mut session = loaded(&["q1", "q2"]);
        session.answer_question(&QuestionId::new("q1"), "a").unwrap();
        session.answer_question(&QuestionId::new("q2"), "c").unwrap();

        let ended_at = fixed_now() + Duration::milliseconds(42_900);
        let result = session.end(ended_at).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 2);
        assert!((result.percentage - 50.0).abs() < f64::EPSILON);
        assert_eq!(result.time_taken_secs, 42);
        assert_eq!(session.status(), QuizStatus::Ended);
        assert_eq!(session.ended_at(), Some(ended_at));
        assert_eq!(session.submission(), &SubmissionState::Pending);

        assert!(session.end(ended_at).is_err());
        assert_eq!(session.result(), Some(&result));
    }

    #[test]
    fn unanswered_questions_count_against_the_score() {
        let mut session = loaded(&["q1", "q2", "q3", "q4"]);
        session.answer_question(&QuestionId::new("q1"), "a").unwrap();
        let result = session.end(fixed_now()).unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 4);
        assert!((result.percentage - 25.0).abs() < f64::EPSILON);
        assert_eq!(result.time_taken_secs, 0);
    }

    #[test]
    fn submission_outcome_respects_generation() {
        let mut session = loaded(&["q1"]);
        session.end(fixed_now()).unwrap();
        let generation = session.generation();

        assert!(session.submission_failed(generation, "offline"));
        assert_eq!(
            session.submission(),
            &SubmissionState::Failed("offline".into())
        );
        // Settled once; the result is still there.
        assert!(!session.submission_failed(generation, "again"));
        assert!(session.result().is_some());

        let mut session = loaded(&["q1"]);
        session.end(fixed_now()).unwrap();
        let generation = session.generation();
        session.reset();
        assert!(!session.submission_failed(generation, "late"));
        assert_eq!(session.submission(), &SubmissionState::NotSubmitted);
    }

    #[test]
    fn reset_discards_everything() {
        let mut session = loaded(&["q1", "q2"]);
        session.answer_question(&QuestionId::new("q1"), "a").unwrap();
        session.end(fixed_now()).unwrap();
        let before = session.generation();

        session.reset();
        assert_eq!(session.status(), QuizStatus::Idle);
        assert!(session.generation() > before);
        assert!(session.questions().is_empty());
        assert!(session.answers().is_empty());
        assert!(session.result().is_none());
        assert!(session.started_at().is_none());
    }

    #[test]
    fn progress_and_feedback_track_answers() {
        let mut session = loaded(&["q1", "q2"]);
        let q1 = QuestionId::new("q1");
        assert!(session.feedback(&q1).is_none());

        session.answer_question(&q1, "b").unwrap();
        session.go_to_next_question();
        let progress = session.progress();
        assert_eq!(progress.total, 2);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.current_position, 2);
        assert!(!session.is_completed());

        let feedback = session.feedback(&q1).unwrap();
        assert_eq!(feedback.selected, "b");
        assert_eq!(feedback.correct_answer, "a");
        assert!(!feedback.is_correct);

        session.answer_question(&QuestionId::new("q2"), "a").unwrap();
        assert!(session.is_completed());
        assert!(session.feedback(&QuestionId::new("q2")).unwrap().is_correct);
    }
}
