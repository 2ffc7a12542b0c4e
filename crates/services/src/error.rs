//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AttemptError, QuestionId, QuizId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the remote quiz API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("quiz api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("quiz api returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while reading API configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiConfigError {
    #[error("invalid quiz api base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid quiz api timeout {raw:?}")]
    InvalidTimeout { raw: String },
}

/// Fetching the quiz or creating the attempt failed; no session was built.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("failed to load quiz {quiz_id}")]
    Quiz {
        quiz_id: QuizId,
        #[source]
        source: ApiError,
    },
    #[error("failed to start an attempt for quiz {quiz_id}")]
    Attempt {
        quiz_id: QuizId,
        #[source]
        source: ApiError,
    },
}

/// Some questions still lack a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} question(s) still need an answer", .missing.len())]
pub struct ValidationError {
    pub missing: Vec<QuestionId>,
}

/// Errors emitted by `QuizSessionService::submit`.
///
/// Every variant leaves the attempt in progress except `AlreadySubmitted`,
/// which reports that it was already graded.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    #[error(transparent)]
    Incomplete(#[from] ValidationError),
    #[error("attempt already submitted")]
    AlreadySubmitted,
    #[error("a submission is already in flight for this attempt")]
    InFlight,
    #[error("session was disposed")]
    Disposed,
    #[error("grading request failed")]
    Api(#[from] ApiError),
    #[error("server returned a result that does not match the quiz")]
    InvalidResult(#[source] AttemptError),
}

/// The API refused to create a new attempt.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RestartError {
    #[error("failed to start a new attempt for quiz {quiz_id}")]
    Api {
        quiz_id: QuizId,
        #[source]
        source: ApiError,
    },
}

/// Errors emitted by `QuizAttemptSession::set_answer`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answers are locked while a submission is in flight")]
    SubmissionInFlight,
    #[error("session was disposed")]
    Disposed,
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

/// Errors emitted by history operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error("attempt has not been graded yet")]
    NotSubmitted,
    #[error("history append already in progress")]
    AppendInProgress,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ApiConfigError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
