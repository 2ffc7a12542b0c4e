#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod error;
pub mod session;

pub use quiz_core::Clock;

pub use api::{HttpQuizApi, QuizApi, QuizApiConfig};
pub use app_services::AppServices;
pub use error::{
    AnswerError, ApiError, AppServicesError, HistoryError, LoadError, RestartError, SubmitError,
    ValidationError,
};
pub use session::{
    AttemptProgress, AttemptTicket, HistoryListItem, QuizAttemptSession, QuizHistoryService,
    QuizSessionService, SubmitOutcome,
};
