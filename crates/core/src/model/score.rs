use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

use crate::scoring::ScoreBreakdown;

/// Maximum length of a leaderboard username, in characters.
pub const USERNAME_MAX_LEN: usize = 50;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ScoreError {
    #[error("username is required")]
    EmptyUsername,

    #[error("username cannot be more than 50 characters")]
    UsernameTooLong,

    #[error("total questions must be at least 1")]
    NoQuestions,

    #[error("score ({score}) cannot exceed total questions ({total})")]
    ScoreAboveTotal { score: u32, total: u32 },

    #[error("percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(f64),
}

/// Validate and normalize a username for the leaderboard.
///
/// # Errors
///
/// Returns `ScoreError` if the trimmed name is empty or too long.
pub fn normalize_username(raw: &str) -> Result<String, ScoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScoreError::EmptyUsername);
    }
    if trimmed.chars().count() > USERNAME_MAX_LEN {
        return Err(ScoreError::UsernameTooLong);
    }
    Ok(trimmed.to_owned())
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

/// Final summary of a completed quiz run.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub time_taken_secs: u64,
}

impl QuizResult {
    #[must_use]
    pub fn from_breakdown(breakdown: ScoreBreakdown, time_taken_secs: u64) -> Self {
        Self {
            score: breakdown.correct,
            total_questions: breakdown.total,
            percentage: breakdown.percentage,
            time_taken_secs,
        }
    }
}

//
// ─── SUBMISSION ────────────────────────────────────────────────────────────────
//

/// A score as written to the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub username: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    #[serde(rename = "timeTaken")]
    pub time_taken_secs: u64,
}

impl ScoreSubmission {
    /// Build a submission for `result` under `username`.
    ///
    /// # Errors
    ///
    /// Returns `ScoreError` if the username or the result values are out of range.
    pub fn from_result(username: &str, result: &QuizResult) -> Result<Self, ScoreError> {
        let submission = Self {
            username: normalize_username(username)?,
            score: result.score,
            total_questions: result.total_questions,
            percentage: result.percentage,
            time_taken_secs: result.time_taken_secs,
        };
        submission.validate()?;
        Ok(submission)
    }

    /// Check the bounds enforced before a score is stored.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a `ScoreError`.
    pub fn validate(&self) -> Result<(), ScoreError> {
        normalize_username(&self.username)?;
        if self.total_questions == 0 {
            return Err(ScoreError::NoQuestions);
        }
        if self.score > self.total_questions {
            return Err(ScoreError::ScoreAboveTotal {
                score: self.score,
                total: self.total_questions,
            });
        }
        if !self.percentage.is_finite() || !(0.0..=100.0).contains(&self.percentage) {
            return Err(ScoreError::InvalidPercentage(self.percentage));
        }
        Ok(())
    }
}

//
// ─── LEADERBOARD ───────────────────────────────────────────────────────────────
//

/// A stored score, as listed on the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    #[serde(rename = "timeTaken")]
    pub time_taken_secs: u64,
    #[serde(alias = "createdAt")]
    pub submitted_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    #[must_use]
    pub fn from_submission(submission: ScoreSubmission, submitted_at: DateTime<Utc>) -> Self {
        Self {
            username: submission.username,
            score: submission.score,
            total_questions: submission.total_questions,
            percentage: submission.percentage,
            time_taken_secs: submission.time_taken_secs,
            submitted_at,
        }
    }

    /// Leaderboard order: higher score first, then faster time, then earlier submission.
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.time_taken_secs.cmp(&other.time_taken_secs))
            .then(self.submitted_at.cmp(&other.submitted_at))
    }
}

/// Sort entries into leaderboard order.
pub fn rank_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(LeaderboardEntry::rank_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn submission(username: &str, score: u32, time: u64) -> ScoreSubmission {
        ScoreSubmission {
            username: username.to_owned(),
            score,
            total_questions: 10,
            percentage: f64::from(score) * 10.0,
            time_taken_secs: time,
        }
    }

    #[test]
    fn validates_submission_bounds() {
        assert!(submission("ana", 7, 40).validate().is_ok());
        assert_eq!(
            submission("  ", 7, 40).validate(),
            Err(ScoreError::EmptyUsername)
        );
        assert_eq!(
            submission(&"x".repeat(51), 7, 40).validate(),
            Err(ScoreError::UsernameTooLong)
        );

        let mut over = submission("ana", 11, 40);
        over.percentage = 100.0;
        assert_eq!(
            over.validate(),
            Err(ScoreError::ScoreAboveTotal {
                score: 11,
                total: 10
            })
        );

        let mut bad_pct = submission("ana", 1, 40);
        bad_pct.percentage = 120.0;
        assert!(matches!(
            bad_pct.validate(),
            Err(ScoreError::InvalidPercentage(_))
        ));

        let mut empty = submission("ana", 0, 40);
        empty.total_questions = 0;
        assert_eq!(empty.validate(), Err(ScoreError::NoQuestions));
    }

    #[test]
    fn ranks_by_score_then_time() {
        let now = fixed_now();
        let mut entries = vec![
            LeaderboardEntry::from_submission(submission("slow", 8, 120), now),
            LeaderboardEntry::from_submission(submission("low", 6, 30), now),
            LeaderboardEntry::from_submission(submission("fast", 8, 60), now),
            LeaderboardEntry::from_submission(
                submission("fast-later", 8, 60),
                now + Duration::seconds(1),
            ),
        ];
        rank_entries(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, ["fast", "fast-later", "slow", "low"]);
    }

    #[test]
    fn submission_from_result_trims_username() {
        let result = QuizResult {
            score: 2,
            total_questions: 3,
            percentage: 200.0 / 3.0,
            time_taken_secs: 15,
        };
        let sub = ScoreSubmission::from_result("  Player42 ", &result).unwrap();
        assert_eq!(sub.username, "Player42");
        assert_eq!(sub.total_questions, 3);
    }
}
