use chrono::{DateTime, Utc};
use quiz_core::model::{LeaderboardEntry, ScoreSubmission};

use super::SqliteRepository;
use super::mapping::{conn, map_score_row, u64_to_i64};
use crate::repository::{ScoreRepository, StorageError};

#[async_trait::async_trait]
impl ScoreRepository for SqliteRepository {
    async fn append_score(
        &self,
        submission: &ScoreSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<LeaderboardEntry, StorageError> {
        let time_taken = u64_to_i64("time_taken", submission.time_taken_secs)?;

        sqlx::query(
            r"
                INSERT INTO scores (
                    username, score, total_questions, percentage, time_taken, submitted_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(submission.username.as_str())
        .bind(i64::from(submission.score))
        .bind(i64::from(submission.total_questions))
        .bind(submission.percentage)
        .bind(time_taken)
        .bind(submitted_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(LeaderboardEntry::from_submission(
            submission.clone(),
            submitted_at,
        ))
    }

    async fn top_scores(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT username, score, total_questions, percentage, time_taken, submitted_at
                FROM scores
                ORDER BY score DESC, time_taken ASC, submitted_at ASC, id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_score_row(&row)?);
        }
        Ok(out)
    }
}
