//! Remote quiz API: the trait the session talks to and its HTTP adapter.

mod config;
mod http;
mod wire;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Answer, AttemptId, AttemptResult, QuestionId, Quiz, QuizId};

pub use crate::error::{ApiConfigError, ApiError};
pub use config::QuizApiConfig;
pub use http::HttpQuizApi;
pub use reqwest::StatusCode;

/// One entry of the user's quiz list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizListing {
    pub quiz_id: QuizId,
    pub title: String,
    pub description: Option<String>,
}

/// A past attempt as recorded by the server.
///
/// Attempts that were started but never graded carry no scores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    pub attempt_id: AttemptId,
    pub score: Option<u32>,
    pub max_score: Option<u32>,
    pub passed: Option<bool>,
    pub started_at: Option<DateTime<Utc>>,
}

impl AttemptSummary {
    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.score.is_some() && self.max_score.is_some()
    }
}

/// One answer as sent for grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub question_id: QuestionId,
    pub answer: Answer,
}

/// Operations offered by the remote quiz backend.
///
/// Grading happens server side; the client only forwards answers and
/// receives the result.
#[async_trait]
pub trait QuizApi: Send + Sync {
    /// `GET /quiz`
    async fn list_quizzes(&self) -> Result<Vec<QuizListing>, ApiError>;

    /// `GET /quiz/{quiz_id}`
    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ApiError>;

    /// `POST /quiz/{quiz_id}/attempts`
    async fn start_attempt(&self, quiz_id: QuizId) -> Result<AttemptId, ApiError>;

    /// `GET /quiz/{quiz_id}/attempts`
    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptSummary>, ApiError>;

    /// `POST /quiz/{quiz_id}/attempts/{attempt_id}/answers`
    ///
    /// `answers` is sent in the given order.
    async fn submit_answers(
        &self,
        quiz_id: QuizId,
        attempt_id: AttemptId,
        answers: &[AnswerSubmission],
    ) -> Result<AttemptResult, ApiError>;
}
