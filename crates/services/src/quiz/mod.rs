//! The quiz session state machine and the engine that drives it.

mod engine;
mod progress;
mod session;

pub use engine::{Advance, QuizEngine};
pub use progress::{AnswerFeedback, QuizProgress};
pub use session::{Generation, QuizSession, QuizStatus, SubmissionState};
