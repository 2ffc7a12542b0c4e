use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{Question, QuestionKind};

/// Discriminant shared by questions and answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    MultipleChoice,
    OpenEnded,
}

impl fmt::Display for AnswerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKind::MultipleChoice => f.write_str("multiple-choice"),
            AnswerKind::OpenEnded => f.write_str("open-ended"),
        }
    }
}

/// A learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    MultipleChoice { selected_index: usize },
    OpenEnded { text: String },
}

impl Answer {
    #[must_use]
    pub fn multiple_choice(selected_index: usize) -> Self {
        Self::MultipleChoice { selected_index }
    }

    #[must_use]
    pub fn open_ended(text: impl Into<String>) -> Self {
        Self::OpenEnded { text: text.into() }
    }

    #[must_use]
    pub fn kind(&self) -> AnswerKind {
        match self {
            Answer::MultipleChoice { .. } => AnswerKind::MultipleChoice,
            Answer::OpenEnded { .. } => AnswerKind::OpenEnded,
        }
    }

    /// Whether this answer counts towards submission for `question`.
    ///
    /// Multiple-choice needs an index inside the choice list; open-ended needs
    /// non-blank text. A kind mismatch is never complete.
    #[must_use]
    pub fn is_complete_for(&self, question: &Question) -> bool {
        match (self, question.kind()) {
            (Answer::MultipleChoice { selected_index }, QuestionKind::MultipleChoice { choices }) => {
                *selected_index < choices.len()
            }
            (Answer::OpenEnded { text }, QuestionKind::OpenEnded) => !text.trim().is_empty(),
            _ => false,
        }
    }
}
