#![forbid(unsafe_code)]

pub mod app_services;
pub mod backend;
pub mod config;
pub mod countdown;
pub mod error;
pub mod leaderboard;
pub mod quiz;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use backend::{HttpBackend, HttpBackendConfig, LocalBackend, QuestionRequest, QuizBackend};
pub use config::QuizConfig;
pub use countdown::Countdown;
pub use error::{AppServicesError, BackendError, ConfigError, QuizError};
pub use leaderboard::{LeaderboardService, RankedEntry};
pub use quiz::{
    Advance, AnswerFeedback, Generation, QuizEngine, QuizProgress, QuizSession,
    QuizStatus, SubmissionState,
};
