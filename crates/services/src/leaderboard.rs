use std::sync::Arc;

use quiz_core::model::LeaderboardEntry;
use quiz_core::time::format_time;

use crate::backend::{QuizBackend, validate_leaderboard_limit};
use crate::error::BackendError;

/// A leaderboard row with its 1-based rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub entry: LeaderboardEntry,
}

impl RankedEntry {
    /// Time taken as `MM:SS`.
    #[must_use]
    pub fn time_label(&self) -> String {
        format_time(self.entry.time_taken_secs)
    }
}

/// Read side of the leaderboard.
#[derive(Clone)]
pub struct LeaderboardService {
    backend: Arc<dyn QuizBackend>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(backend: Arc<dyn QuizBackend>) -> Self {
        Self { backend }
    }

    /// Best `limit` scores with ranks attached.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Validation` for a limit outside `1..=100`, or the
    /// backend's error when the fetch fails.
    pub async fn top(&self, limit: u32) -> Result<Vec<RankedEntry>, BackendError> {
        validate_leaderboard_limit(limit)?;
        let entries = self.backend.fetch_leaderboard(limit).await?;
        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedEntry { rank: i + 1, entry })
            .collect())
    }
}
