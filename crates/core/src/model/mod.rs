mod ids;
mod question;
mod score;

pub use ids::QuestionId;

pub use question::{
    AnswerKey, AnsweredQuestion, Answers, Difficulty, Question, QuestionDetails, QuestionError,
    difficulty_label,
};
pub use score::{
    LeaderboardEntry, QuizResult, ScoreError, ScoreSubmission, USERNAME_MAX_LEN,
    normalize_username, rank_entries,
};
