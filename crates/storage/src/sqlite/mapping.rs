use quiz_core::model::{
    AnsweredQuestion, Difficulty, LeaderboardEntry, Question, QuestionDetails, QuestionId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn encode_options(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn decode_options(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn parse_difficulty(raw: Option<String>) -> Result<Option<Difficulty>, StorageError> {
    raw.map(|s| s.parse::<Difficulty>().map_err(ser)).transpose()
}

pub(crate) fn map_question_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AnsweredQuestion, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let text: String = row.try_get("text").map_err(ser)?;
    let options = decode_options(&row.try_get::<String, _>("options").map_err(ser)?)?;
    let category: Option<String> = row.try_get("category").map_err(ser)?;
    let difficulty = parse_difficulty(row.try_get("difficulty").map_err(ser)?)?;
    let correct_answer: String = row.try_get("correct_answer").map_err(ser)?;

    let question = Question::new(
        QuestionId::new(id),
        text,
        options,
        QuestionDetails::new(category, difficulty),
    )
    .map_err(ser)?;
    AnsweredQuestion::new(question, correct_answer).map_err(ser)
}

pub(crate) fn map_score_row(row: &sqlx::sqlite::SqliteRow) -> Result<LeaderboardEntry, StorageError> {
    let time_taken: i64 = row.try_get("time_taken").map_err(ser)?;
    Ok(LeaderboardEntry {
        username: row.try_get("username").map_err(ser)?,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        total_questions: u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        percentage: row.try_get("percentage").map_err(ser)?,
        time_taken_secs: u64::try_from(time_taken)
            .map_err(|_| StorageError::Serialization(format!("invalid time_taken: {time_taken}")))?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
    })
}
