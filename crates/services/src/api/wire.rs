//! JSON shapes used by the quiz backend.
//!
//! Field names follow the server verbatim, including its mixed casing.

use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, AttemptId, AttemptResult, Question, QuestionDetail, QuestionId, QuestionKind, Quiz,
    QuizId,
};
use serde::{Deserialize, Serialize};

use super::{AnswerSubmission, AttemptSummary, QuizListing};
use crate::error::ApiError;

const TYPE_MCQ: &str = "mcq";
const TYPE_OPEN: &str = "open";

fn invalid<E: std::fmt::Display>(e: E) -> ApiError {
    ApiError::InvalidResponse(e.to_string())
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizListingWire {
    #[serde(rename = "QuizID")]
    quiz_id: u64,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

impl From<QuizListingWire> for QuizListing {
    fn from(w: QuizListingWire) -> Self {
        Self {
            quiz_id: QuizId::new(w.quiz_id),
            title: w.title,
            description: w.description.filter(|d| !d.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuizDetailWire {
    quiz: QuizMetaWire,
    #[serde(default)]
    questions: Vec<QuestionWire>,
}

#[derive(Debug, Deserialize)]
struct QuizMetaWire {
    #[serde(rename = "QuizID", default)]
    quiz_id: Option<u64>,
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuestionWire {
    #[serde(rename = "questionID")]
    question_id: u64,
    text: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    choices: Option<Vec<String>>,
}

impl QuestionWire {
    fn into_question(self) -> Result<Question, ApiError> {
        let kind = match self.kind.as_str() {
            TYPE_MCQ => QuestionKind::MultipleChoice {
                choices: self.choices.unwrap_or_default(),
            },
            TYPE_OPEN => QuestionKind::OpenEnded,
            other => {
                return Err(ApiError::InvalidResponse(format!(
                    "question {} has unknown type {other:?}",
                    self.question_id
                )));
            }
        };
        Question::new(QuestionId::new(self.question_id), self.text, kind).map_err(invalid)
    }
}

impl QuizDetailWire {
    /// The requested id wins; the body id is only checked when present.
    pub(crate) fn into_quiz(self, requested: QuizId) -> Result<Quiz, ApiError> {
        if let Some(id) = self.quiz.quiz_id {
            if id != requested.value() {
                return Err(ApiError::InvalidResponse(format!(
                    "asked for quiz {requested}, got quiz {id}"
                )));
            }
        }
        let questions = self
            .questions
            .into_iter()
            .map(QuestionWire::into_question)
            .collect::<Result<Vec<_>, _>>()?;
        Quiz::new(requested, self.quiz.title, self.quiz.description, questions).map_err(invalid)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartAttemptWire {
    #[serde(rename = "attemptID")]
    attempt_id: u64,
}

impl From<StartAttemptWire> for AttemptId {
    fn from(w: StartAttemptWire) -> Self {
        AttemptId::new(w.attempt_id)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptSummaryWire {
    #[serde(rename = "AttemptID")]
    attempt_id: u64,
    #[serde(rename = "Score", default)]
    score: Option<u32>,
    #[serde(rename = "MaxScore", default)]
    max_score: Option<u32>,
    #[serde(rename = "IsPassed", default)]
    is_passed: Option<bool>,
    #[serde(rename = "StartedAt", default)]
    started_at: Option<String>,
}

impl From<AttemptSummaryWire> for AttemptSummary {
    fn from(w: AttemptSummaryWire) -> Self {
        // Timestamps are informational; an unparseable one is dropped rather
        // than failing the whole listing.
        let started_at = w
            .started_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        Self {
            attempt_id: AttemptId::new(w.attempt_id),
            score: w.score,
            max_score: w.max_score,
            passed: w.is_passed,
            started_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitRequestWire<'a> {
    answers: Vec<AnswerWire<'a>>,
}

#[derive(Debug, Serialize)]
struct AnswerWire<'a> {
    #[serde(rename = "questionID")]
    question_id: u64,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "selectedIndex", skip_serializing_if = "Option::is_none")]
    selected_index: Option<usize>,
    #[serde(rename = "answerText", skip_serializing_if = "Option::is_none")]
    answer_text: Option<&'a str>,
}

impl<'a> SubmitRequestWire<'a> {
    pub(crate) fn from_answers(answers: &'a [AnswerSubmission]) -> Self {
        let answers = answers
            .iter()
            .map(|s| match &s.answer {
                Answer::MultipleChoice { selected_index } => AnswerWire {
                    question_id: s.question_id.value(),
                    kind: TYPE_MCQ,
                    selected_index: Some(*selected_index),
                    answer_text: None,
                },
                Answer::OpenEnded { text } => AnswerWire {
                    question_id: s.question_id.value(),
                    kind: TYPE_OPEN,
                    selected_index: None,
                    answer_text: Some(text.as_str()),
                },
            })
            .collect();
        Self { answers }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponseWire {
    #[serde(rename = "totalScore")]
    total_score: u32,
    #[serde(rename = "maxScore")]
    max_score: u32,
    #[serde(rename = "isPassed", default)]
    is_passed: Option<bool>,
    #[serde(default)]
    details: Vec<DetailWire>,
}

#[derive(Debug, Deserialize)]
struct DetailWire {
    #[serde(rename = "questionID")]
    question_id: u64,
    correct: bool,
    #[serde(rename = "correctAnswer", default)]
    correct_answer: Option<String>,
}

impl SubmitResponseWire {
    pub(crate) fn into_result(self) -> Result<AttemptResult, ApiError> {
        let details = self
            .details
            .into_iter()
            .map(|d| QuestionDetail {
                question_id: QuestionId::new(d.question_id),
                correct: d.correct,
                correct_answer: d.correct_answer.filter(|a| !a.trim().is_empty()),
            })
            .collect();
        AttemptResult::new(self.total_score, self.max_score, self.is_passed, details)
            .map_err(invalid)
    }
}
