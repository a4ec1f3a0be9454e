use quiz_core::model::QuestionId;

/// Aggregated view of quiz progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub total: usize,
    pub answered: usize,
    /// 1-based position of the current question; 0 when nothing is loaded.
    pub current_position: usize,
}

impl QuizProgress {
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }
}

/// Per-question feedback shown after an answer is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub selected: String,
    pub correct_answer: String,
    pub is_correct: bool,
}
