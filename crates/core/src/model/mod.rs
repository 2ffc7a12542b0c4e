mod answer;
mod attempt;
mod history;
mod ids;
mod quiz;
mod result;

pub use ids::{AttemptId, ParseIdError, QuestionId, QuizId};

pub use answer::{Answer, AnswerKind};
pub use attempt::{Attempt, AttemptError, AttemptState};
pub use history::{HistoryEntry, HistoryEntryError};
pub use quiz::{Question, QuestionKind, Quiz, QuizError};
pub use result::{AttemptResult, QuestionDetail, ResultError};
