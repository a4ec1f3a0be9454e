use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    AnswerKey, Difficulty, LeaderboardEntry, Question, QuestionDetails, QuestionId,
    ScoreSubmission,
};

use super::{QuestionRequest, QuizBackend, validate_leaderboard_limit};
use crate::error::BackendError;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Upper bound on any single request, including score submission.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpBackendConfig {
    pub base_url: String,
}

impl HttpBackendConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Reads `QUIZ_API_URL`; `None` when unset or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("QUIZ_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self::new(base_url.trim()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url.trim_end_matches('/'))
    }
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// JSON client for a remote quiz server.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: HttpBackendConfig,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_else(|err| {
                    log::warn!("falling back to a default HTTP client: {err}");
                    Client::new()
                }),
            config,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait]
impl QuizBackend for HttpBackend {
    async fn fetch_questions(
        &self,
        request: &QuestionRequest,
    ) -> Result<Vec<Question>, BackendError> {
        request.validate()?;
        let mut query = vec![("limit", request.count.to_string())];
        if let Some(category) = &request.category {
            query.push(("category", category.clone()));
        }
        if let Some(difficulty) = request.difficulty {
            query.push(("difficulty", difficulty.as_str().to_owned()));
        }

        let response = self
            .client
            .get(self.config.endpoint("questions"))
            .query(&query)
            .send()
            .await?;
        let dtos: Vec<QuestionDto> = read_envelope(response).await?;
        dtos.into_iter().map(QuestionDto::into_question).collect()
    }

    async fn fetch_answer_key(&self, ids: &[QuestionId]) -> Result<AnswerKey, BackendError> {
        let response = self
            .client
            .post(self.config.endpoint("answers"))
            .json(&AnswerKeyRequest { ids })
            .send()
            .await?;
        let dtos: Vec<AnswerDto> = read_envelope(response).await?;
        Ok(dtos
            .into_iter()
            .map(|a| (QuestionId::new(a.id), a.correct_answer))
            .collect())
    }

    async fn submit_result(
        &self,
        submission: &ScoreSubmission,
    ) -> Result<LeaderboardEntry, BackendError> {
        submission.validate()?;
        let response = self
            .client
            .post(self.config.endpoint("score"))
            .json(submission)
            .send()
            .await?;
        read_envelope(response).await
    }

    async fn fetch_leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, BackendError> {
        validate_leaderboard_limit(limit)?;
        let response = self
            .client
            .get(self.config.endpoint("leaderboard"))
            .query(&[("limit", limit)])
            .send()
            .await?;
        read_envelope(response).await
    }
}

//
// ─── WIRE FORMAT ───────────────────────────────────────────────────────────────
//

/// `{ success, data?, error?, message? }` as returned by every route.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    message: Option<String>,
}

impl<T> Envelope<T> {
    /// Servers put the reason in `error`, some only fill `message`.
    fn reason(self) -> Option<String> {
        self.error.or(self.message)
    }
}

async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    decode_envelope(status, &body)
}

fn decode_envelope<T: DeserializeOwned>(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<T, BackendError> {
    let envelope: Option<Envelope<T>> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let message = envelope
            .and_then(Envelope::reason)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_owned());
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(BackendError::Validation(message));
        }
        return Err(BackendError::HttpStatus { status, message });
    }

    let envelope = envelope.ok_or_else(|| BackendError::HttpStatus {
        status,
        message: "malformed response body".into(),
    })?;
    if !envelope.success {
        return Err(BackendError::HttpStatus {
            status,
            message: envelope.reason().unwrap_or_else(|| "request failed".into()),
        });
    }
    envelope.data.ok_or(BackendError::EmptyResponse)
}

#[derive(Debug, Serialize)]
struct AnswerKeyRequest<'a> {
    ids: &'a [QuestionId],
}

#[derive(Debug, Deserialize)]
struct QuestionDto {
    id: String,
    text: String,
    options: Vec<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

impl QuestionDto {
    fn into_question(self) -> Result<Question, BackendError> {
        // Unrecognized difficulty strings degrade to "unknown".
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|d| d.parse::<Difficulty>().ok());
        let question = Question::new(
            QuestionId::new(self.id),
            self.text,
            self.options,
            QuestionDetails::new(self.category, difficulty),
        )
        .map_err(quiz_core::Error::from)?;
        Ok(question)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerDto {
    id: String,
    correct_answer: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn endpoint_joins_base_url() {
        let config = HttpBackendConfig::new("http://quiz.test/");
        assert_eq!(config.endpoint("score"), "http://quiz.test/api/score");
    }

    #[test]
    fn decodes_question_payload() {
        let body = r#"{
            "success": true,
            "message": "Questions retrieved successfully",
            "data": [
                {"id": "q1", "text": "2+2?", "options": ["3", "4"], "category": "Math", "difficulty": "easy"},
                {"id": "q2", "text": "Sky?", "options": ["Blue", "Green"], "difficulty": "weird"}
            ]
        }"#;
        let dtos: Vec<QuestionDto> = decode_envelope(StatusCode::OK, body).unwrap();
        let questions: Vec<Question> = dtos
            .into_iter()
            .map(QuestionDto::into_question)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].category(), Some("Math"));
        assert_eq!(questions[0].difficulty(), Some(Difficulty::Easy));
        assert_eq!(questions[1].difficulty(), None);
    }

    #[test]
    fn malformed_question_is_invalid_data() {
        let dto = QuestionDto {
            id: "q1".into(),
            text: "only one option".into(),
            options: vec!["a".into()],
            category: None,
            difficulty: None,
        };
        assert!(matches!(
            dto.into_question(),
            Err(BackendError::InvalidData(_))
        ));
    }

    #[test]
    fn decodes_answer_key_and_leaderboard() {
        let body = r#"{"success": true, "data": [{"id": "q1", "correctAnswer": "4"}]}"#;
        let answers: Vec<AnswerDto> = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(answers[0].correct_answer, "4");

        let body = r#"{"success": true, "data": [{
            "username": "ana", "score": 8, "totalQuestions": 10, "percentage": 80.0,
            "timeTaken": 42, "createdAt": "2024-01-01T00:00:00Z"
        }]}"#;
        let board: Vec<LeaderboardEntry> = decode_envelope(StatusCode::OK, body).unwrap();
        assert_eq!(board[0].username, "ana");
        assert_eq!(board[0].time_taken_secs, 42);
    }

    #[test]
    fn error_envelope_maps_to_backend_error() {
        let body = r#"{"success": false, "error": "Limit must be between 1 and 50"}"#;
        let err = decode_envelope::<Vec<QuestionDto>>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, BackendError::Validation(m) if m.contains("between 1 and 50")));

        let err = decode_envelope::<Vec<QuestionDto>>(StatusCode::INTERNAL_SERVER_ERROR, "oops")
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::HttpStatus { status, .. } if status == StatusCode::INTERNAL_SERVER_ERROR
        ));

        let err = decode_envelope::<Vec<QuestionDto>>(StatusCode::OK, r#"{"success": true}"#)
            .unwrap_err();
        assert!(matches!(err, BackendError::EmptyResponse));
    }

    #[test]
    fn message_field_explains_failure_without_error() {
        let body = r#"{"success": false, "message": "Leaderboard is read-only"}"#;
        let err = decode_envelope::<Vec<AnswerDto>>(StatusCode::OK, body).unwrap_err();
        assert!(matches!(
            err,
            BackendError::HttpStatus { message, .. } if message == "Leaderboard is read-only"
        ));

        let body = r#"{"success": false, "message": "Username is required"}"#;
        let err = decode_envelope::<Vec<AnswerDto>>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, BackendError::Validation(m) if m == "Username is required"));

        let body = r#"{"success": false, "error": "Bad limit", "message": "ignored"}"#;
        let err = decode_envelope::<Vec<AnswerDto>>(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(err, BackendError::Validation(m) if m == "Bad limit"));
    }
}
