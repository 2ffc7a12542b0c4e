mod attempt_session;
mod history;
mod progress;
mod service;

// Public API of the session subsystem.
pub use crate::error::{AnswerError, HistoryError, LoadError, RestartError, SubmitError};
pub use attempt_session::{AttemptTicket, QuizAttemptSession};
pub use history::{HistoryListItem, QuizHistoryService};
pub use progress::AttemptProgress;
pub use service::{QuizSessionService, SubmitOutcome};
