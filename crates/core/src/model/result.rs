use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{QuestionId, Quiz};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("total score {total} exceeds max score {max}")]
    ScoreExceedsMax { total: u32, max: u32 },

    #[error("result lists question {0} more than once")]
    DuplicateDetail(QuestionId),

    #[error("result references question {0} which is not in the quiz")]
    UnknownQuestion(QuestionId),

    #[error("result has no detail for question {0}")]
    MissingDetail(QuestionId),
}

/// Grading outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDetail {
    pub question_id: QuestionId,
    pub correct: bool,
    /// Correct choice text for multiple-choice, model answer for open-ended.
    pub correct_answer: Option<String>,
}

/// Server-graded result of a submitted attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    total_score: u32,
    max_score: u32,
    passed: Option<bool>,
    details: Vec<QuestionDetail>,
}

impl AttemptResult {
    /// # Errors
    ///
    /// Returns `ResultError::ScoreExceedsMax` when `total_score > max_score`.
    pub fn new(
        total_score: u32,
        max_score: u32,
        passed: Option<bool>,
        details: Vec<QuestionDetail>,
    ) -> Result<Self, ResultError> {
        if total_score > max_score {
            return Err(ResultError::ScoreExceedsMax {
                total: total_score,
                max: max_score,
            });
        }
        Ok(Self {
            total_score,
            max_score,
            passed,
            details,
        })
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    #[must_use]
    pub fn details(&self) -> &[QuestionDetail] {
        &self.details
    }

    /// Detail lookup by question id; position in `details` carries no meaning.
    #[must_use]
    pub fn detail_for(&self, question_id: QuestionId) -> Option<&QuestionDetail> {
        self.details.iter().find(|d| d.question_id == question_id)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.details.iter().filter(|d| d.correct).count()
    }

    /// Checks that the details cover exactly the quiz's question set.
    ///
    /// # Errors
    ///
    /// Returns the first duplicate, foreign or missing question found.
    pub fn ensure_covers(&self, quiz: &Quiz) -> Result<(), ResultError> {
        let mut seen = HashSet::with_capacity(self.details.len());
        for detail in &self.details {
            if !quiz.contains(detail.question_id) {
                return Err(ResultError::UnknownQuestion(detail.question_id));
            }
            if !seen.insert(detail.question_id) {
                return Err(ResultError::DuplicateDetail(detail.question_id));
            }
        }
        if let Some(missing) = quiz.question_ids().find(|id| !seen.contains(id)) {
            return Err(ResultError::MissingDetail(missing));
        }
        Ok(())
    }
}
