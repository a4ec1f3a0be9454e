use std::sync::Arc;

use storage::repository::{QuestionRepository, Storage};
use storage::seed::{replace_questions, sample_questions};

use crate::Clock;
use crate::backend::{HttpBackend, HttpBackendConfig, LocalBackend, QuizBackend};
use crate::config::QuizConfig;
use crate::error::AppServicesError;
use crate::leaderboard::LeaderboardService;
use crate::quiz::QuizEngine;

/// Assembles the backend and the services built on top of it.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    backend: Arc<dyn QuizBackend>,
    leaderboard: Arc<LeaderboardService>,
}

impl AppServices {
    #[must_use]
    pub fn new(clock: Clock, backend: Arc<dyn QuizBackend>) -> Self {
        let leaderboard = Arc::new(LeaderboardService::new(Arc::clone(&backend)));
        Self {
            clock,
            backend,
            leaderboard,
        }
    }

    /// Build services backed by `SQLite` storage, seeding sample questions
    /// into an empty bank.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or seeding fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        ensure_questions(storage.questions.as_ref()).await?;
        let backend: Arc<dyn QuizBackend> = Arc::new(LocalBackend::from_storage(clock, &storage));
        Ok(Self::new(clock, backend))
    }

    /// Build services backed by in-memory storage with the sample questions.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if seeding fails.
    pub async fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::in_memory();
        ensure_questions(storage.questions.as_ref()).await?;
        let backend: Arc<dyn QuizBackend> = Arc::new(LocalBackend::from_storage(clock, &storage));
        Ok(Self::new(clock, backend))
    }

    /// Build services talking to a remote quiz server.
    #[must_use]
    pub fn new_http(config: HttpBackendConfig, clock: Clock) -> Self {
        log::info!("using quiz server at {}", config.base_url);
        Self::new(clock, Arc::new(HttpBackend::new(config)))
    }

    /// A fresh engine for one player.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Config` if `config` is out of range.
    pub fn quiz_engine(&self, config: QuizConfig) -> Result<QuizEngine, AppServicesError> {
        config.validate()?;
        Ok(QuizEngine::new(Arc::clone(&self.backend), config).with_clock(self.clock))
    }

    #[must_use]
    pub fn leaderboard(&self) -> Arc<LeaderboardService> {
        Arc::clone(&self.leaderboard)
    }

    #[must_use]
    pub fn backend(&self) -> Arc<dyn QuizBackend> {
        Arc::clone(&self.backend)
    }
}

async fn ensure_questions(questions: &dyn QuestionRepository) -> Result<(), AppServicesError> {
    if questions.count_questions().await? > 0 {
        return Ok(());
    }
    let seeded = replace_questions(questions, &sample_questions()?).await?;
    log::info!("question bank was empty; seeded {seeded} sample questions");
    Ok(())
}
