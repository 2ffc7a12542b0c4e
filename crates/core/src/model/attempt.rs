use std::collections::HashMap;

use thiserror::Error;

use crate::model::{
    Answer, AnswerKind, AttemptId, AttemptResult, Question, QuestionId, Quiz, QuizId, ResultError,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("attempt already submitted")]
    Submitted,

    #[error("attempt belongs to quiz {expected}, got quiz {got}")]
    QuizMismatch { expected: QuizId, got: QuizId },

    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),

    #[error("question {question_id} expects a {expected} answer, got {got}")]
    KindMismatch {
        question_id: QuestionId,
        expected: AnswerKind,
        got: AnswerKind,
    },

    #[error("choice {index} is out of range for question {question_id} ({choices} choices)")]
    ChoiceOutOfRange {
        question_id: QuestionId,
        index: usize,
        choices: usize,
    },

    #[error(transparent)]
    Result(#[from] ResultError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    InProgress,
    Submitted,
}

/// One attempt at a quiz: answers keyed by question, plus the graded result
/// once the server has produced it.
///
/// The attempt never stores an answer for a question outside its quiz and
/// refuses every mutation after a result is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    id: AttemptId,
    quiz_id: QuizId,
    answers: HashMap<QuestionId, Answer>,
    result: Option<AttemptResult>,
}

impl Attempt {
    #[must_use]
    pub fn new(id: AttemptId, quiz_id: QuizId) -> Self {
        Self {
            id,
            quiz_id,
            answers: HashMap::new(),
            result: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttemptId {
        self.id
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn state(&self) -> AttemptState {
        if self.result.is_some() {
            AttemptState::Submitted
        } else {
            AttemptState::InProgress
        }
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.result.is_some()
    }

    #[must_use]
    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<&Answer> {
        self.answers.get(&question_id)
    }

    #[must_use]
    pub fn answer_count(&self) -> usize {
        self.answers.len()
    }

    /// Insert or overwrite the answer for `question_id`.
    ///
    /// Returns the previous answer, if any.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Submitted` once a result is attached, and
    /// `UnknownQuestion` / `KindMismatch` / `ChoiceOutOfRange` when the answer
    /// does not fit the question. The attempt is unchanged on error.
    pub fn set_answer(
        &mut self,
        quiz: &Quiz,
        question_id: QuestionId,
        answer: Answer,
    ) -> Result<Option<Answer>, AttemptError> {
        self.ensure_mutable(quiz)?;
        let question = quiz
            .question(question_id)
            .ok_or(AttemptError::UnknownQuestion(question_id))?;
        check_fits(question, &answer)?;
        Ok(self.answers.insert(question_id, answer))
    }

    /// Remove the answer for `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Submitted` once a result is attached.
    pub fn clear_answer(
        &mut self,
        quiz: &Quiz,
        question_id: QuestionId,
    ) -> Result<Option<Answer>, AttemptError> {
        self.ensure_mutable(quiz)?;
        Ok(self.answers.remove(&question_id))
    }

    /// Ids of questions without a complete answer, in quiz order.
    #[must_use]
    pub fn missing_answers(&self, quiz: &Quiz) -> Vec<QuestionId> {
        quiz.questions()
            .iter()
            .filter(|q| {
                !self
                    .answers
                    .get(&q.id())
                    .is_some_and(|a| a.is_complete_for(q))
            })
            .map(Question::id)
            .collect()
    }

    /// Number of questions with a complete answer.
    #[must_use]
    pub fn completed_count(&self, quiz: &Quiz) -> usize {
        quiz.len() - self.missing_answers(quiz).len()
    }

    /// Answers paired with their question, in quiz order.
    ///
    /// Questions without an answer are skipped.
    #[must_use]
    pub fn ordered_answers<'a>(&'a self, quiz: &'a Quiz) -> Vec<(&'a Question, &'a Answer)> {
        quiz.questions()
            .iter()
            .filter_map(|q| self.answers.get(&q.id()).map(|a| (q, a)))
            .collect()
    }

    /// Attach the graded result, moving the attempt to `Submitted`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Submitted` if a result is already attached, or
    /// `AttemptError::Result` when the details do not cover the quiz.
    pub fn attach_result(&mut self, quiz: &Quiz, result: AttemptResult) -> Result<(), AttemptError> {
        self.ensure_mutable(quiz)?;
        result.ensure_covers(quiz)?;
        self.result = Some(result);
        Ok(())
    }

    fn ensure_mutable(&self, quiz: &Quiz) -> Result<(), AttemptError> {
        if quiz.id() != self.quiz_id {
            return Err(AttemptError::QuizMismatch {
                expected: self.quiz_id,
                got: quiz.id(),
            });
        }
        if self.is_submitted() {
            return Err(AttemptError::Submitted);
        }
        Ok(())
    }
}

fn check_fits(question: &Question, answer: &Answer) -> Result<(), AttemptError> {
    if question.answer_kind() != answer.kind() {
        return Err(AttemptError::KindMismatch {
            question_id: question.id(),
            expected: question.answer_kind(),
            got: answer.kind(),
        });
    }
    if let Answer::MultipleChoice { selected_index } = answer {
        let choices = question.choices().len();
        if *selected_index >= choices {
            return Err(AttemptError::ChoiceOutOfRange {
                question_id: question.id(),
                index: *selected_index,
                choices,
            });
        }
    }
    Ok(())
}
