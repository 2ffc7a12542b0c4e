use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{AttemptId, AttemptResult, Quiz, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum HistoryEntryError {
    #[error("score ({score}) exceeds max score ({max_score})")]
    ScoreExceedsMax { score: u32, max_score: u32 },
}

/// Snapshot of a graded attempt kept in the local history log.
///
/// Entries are denormalized so the history survives without the quiz
/// being fetched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    quiz_id: QuizId,
    attempt_id: AttemptId,
    title: String,
    completed_at: DateTime<Utc>,
    score: u32,
    max_score: u32,
    passed: Option<bool>,
}

impl HistoryEntry {
    /// Rehydrate an entry from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `HistoryEntryError::ScoreExceedsMax` if the stored score is impossible.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        quiz_id: QuizId,
        attempt_id: AttemptId,
        title: String,
        completed_at: DateTime<Utc>,
        score: u32,
        max_score: u32,
        passed: Option<bool>,
    ) -> Result<Self, HistoryEntryError> {
        if score > max_score {
            return Err(HistoryEntryError::ScoreExceedsMax { score, max_score });
        }
        Ok(Self {
            quiz_id,
            attempt_id,
            title,
            completed_at,
            score,
            max_score,
            passed,
        })
    }

    /// Build the entry for a freshly graded attempt.
    #[must_use]
    pub fn from_result(
        quiz: &Quiz,
        attempt_id: AttemptId,
        result: &AttemptResult,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            quiz_id: quiz.id(),
            attempt_id,
            title: quiz.title().to_owned(),
            completed_at,
            score: result.total_score(),
            max_score: result.max_score(),
            passed: result.passed(),
        }
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }
}
