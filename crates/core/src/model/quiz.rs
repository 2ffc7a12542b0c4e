use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AnswerKind, QuestionId, QuizId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("multiple-choice question {0} has no choices")]
    NoChoices(QuestionId),
}

/// Declared type of a question, carrying the choices for multiple-choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { choices: Vec<String> },
    OpenEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    kind: QuestionKind,
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuizError::NoChoices` for a multiple-choice question without choices.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        kind: QuestionKind,
    ) -> Result<Self, QuizError> {
        if let QuestionKind::MultipleChoice { choices } = &kind {
            if choices.is_empty() {
                return Err(QuizError::NoChoices(id));
            }
        }
        Ok(Self {
            id,
            text: text.into(),
            kind,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> &QuestionKind {
        &self.kind
    }

    /// The answer variant this question accepts.
    #[must_use]
    pub fn answer_kind(&self) -> AnswerKind {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => AnswerKind::MultipleChoice,
            QuestionKind::OpenEnded => AnswerKind::OpenEnded,
        }
    }

    /// Choices in display order; empty for open-ended questions.
    #[must_use]
    pub fn choices(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { choices } => choices,
            QuestionKind::OpenEnded => &[],
        }
    }
}

/// A quiz as served by the remote API. Question order is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    id: QuizId,
    title: String,
    description: Option<String>,
    questions: Vec<Question>,
}

impl Quiz {
    /// # Errors
    ///
    /// Returns `QuizError::NoQuestions` for an empty question list and
    /// `QuizError::DuplicateQuestion` when two questions share an id.
    pub fn new(
        id: QuizId,
        title: impl Into<String>,
        description: Option<String>,
        questions: Vec<Question>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(QuizError::DuplicateQuestion(q.id()));
            }
        }

        let description = description.filter(|d| !d.trim().is_empty());
        Ok(Self {
            id,
            title: title.into(),
            description,
            questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.question(id).is_some()
    }

    /// Question ids in quiz order.
    pub fn question_ids(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.questions.iter().map(Question::id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
