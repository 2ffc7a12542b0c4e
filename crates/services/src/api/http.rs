use async_trait::async_trait;
use log::debug;
use quiz_core::model::{AttemptId, AttemptResult, Quiz, QuizId};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use super::config::QuizApiConfig;
use super::wire::{
    AttemptSummaryWire, QuizDetailWire, QuizListingWire, StartAttemptWire, SubmitRequestWire,
    SubmitResponseWire,
};
use super::{AnswerSubmission, AttemptSummary, QuizApi, QuizListing};
use crate::error::ApiError;

/// `QuizApi` over HTTP with bearer authentication.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    config: QuizApiConfig,
}

impl HttpQuizApi {
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(config: QuizApiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &QuizApiConfig {
        &self.config
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.authorized(request).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::HttpStatus(response.status()));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.config.endpoint(path);
        debug!("GET {url}");
        self.send(self.client.get(url)).await
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn list_quizzes(&self) -> Result<Vec<QuizListing>, ApiError> {
        let rows: Vec<QuizListingWire> = self.get("quiz").await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ApiError> {
        let body: QuizDetailWire = self.get(&format!("quiz/{quiz_id}")).await?;
        body.into_quiz(quiz_id)
    }

    async fn start_attempt(&self, quiz_id: QuizId) -> Result<AttemptId, ApiError> {
        let url = self.config.endpoint(&format!("quiz/{quiz_id}/attempts"));
        debug!("POST {url}");
        let body: StartAttemptWire = self.send(self.client.post(url)).await?;
        Ok(body.into())
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptSummary>, ApiError> {
        let rows: Vec<AttemptSummaryWire> =
            self.get(&format!("quiz/{quiz_id}/attempts")).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn submit_answers(
        &self,
        quiz_id: QuizId,
        attempt_id: AttemptId,
        answers: &[AnswerSubmission],
    ) -> Result<AttemptResult, ApiError> {
        let url = self
            .config
            .endpoint(&format!("quiz/{quiz_id}/attempts/{attempt_id}/answers"));
        debug!("POST {url} ({} answers)", answers.len());
        let payload = SubmitRequestWire::from_answers(answers);
        let body: SubmitResponseWire = self.send(self.client.post(url).json(&payload)).await?;
        body.into_result()
    }
}
