use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use log::debug;
use quiz_core::model::{
    Answer, Attempt, AttemptId, AttemptResult, AttemptState, HistoryEntry, QuestionDetail,
    QuestionId, Quiz, QuizId,
};
use storage::repository::HistoryEntryId;

use super::progress::AttemptProgress;
use crate::api::AnswerSubmission;
use crate::error::{AnswerError, HistoryError, SubmitError, ValidationError};

/// Identifies an attempt to resume, as returned by `QuizSessionService::restart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttemptTicket {
    pub quiz_id: QuizId,
    pub attempt_id: AttemptId,
}

/// What a history append should do next.
pub(crate) enum HistoryClaim {
    Recorded(HistoryEntryId),
    Pending(HistoryEntry),
}

/// Client-side state of one quiz attempt.
///
/// The session is shared by reference between the UI and the submit task,
/// so all mutable state sits behind a mutex that is never held across an
/// `.await`. A graded session is frozen: answers can no longer change and
/// the result is never replaced.
#[derive(Debug)]
pub struct QuizAttemptSession {
    quiz: Arc<Quiz>,
    inner: Mutex<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    attempt: Attempt,
    submitting: bool,
    disposed: bool,
    completed_at: Option<DateTime<Utc>>,
    history_id: Option<HistoryEntryId>,
    history_appending: bool,
}

impl QuizAttemptSession {
    #[must_use]
    pub fn new(quiz: Arc<Quiz>, attempt_id: AttemptId) -> Self {
        let attempt = Attempt::new(attempt_id, quiz.id());
        Self {
            quiz,
            inner: Mutex::new(SessionInner {
                attempt,
                submitting: false,
                disposed: false,
                completed_at: None,
                history_id: None,
                history_appending: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // Every mutation keeps the attempt valid, so a poisoned lock still
        // holds usable state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn shared_quiz(&self) -> Arc<Quiz> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz.id()
    }

    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.lock().attempt.id()
    }

    #[must_use]
    pub fn state(&self) -> AttemptState {
        self.lock().attempt.state()
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.lock().attempt.is_submitted()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.lock().submitting
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<Answer> {
        self.lock().attempt.answer(question_id).cloned()
    }

    /// Record or overwrite the answer for a question.
    ///
    /// Returns the answer it replaced.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::SubmissionInFlight` while grading is pending,
    /// `AnswerError::Disposed` after `dispose`, and `AnswerError::Attempt`
    /// when the attempt is graded or the answer does not fit the question.
    /// Nothing changes on error.
    pub fn set_answer(
        &self,
        question_id: QuestionId,
        answer: Answer,
    ) -> Result<Option<Answer>, AnswerError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        Ok(inner.attempt.set_answer(&self.quiz, question_id, answer)?)
    }

    /// # Errors
    ///
    /// Same conditions as `set_answer`.
    pub fn clear_answer(&self, question_id: QuestionId) -> Result<Option<Answer>, AnswerError> {
        let mut inner = self.lock();
        inner.ensure_editable()?;
        Ok(inner.attempt.clear_answer(&self.quiz, question_id)?)
    }

    /// Questions still lacking a complete answer, in quiz order.
    #[must_use]
    pub fn missing_answers(&self) -> Vec<QuestionId> {
        self.lock().attempt.missing_answers(&self.quiz)
    }

    /// # Errors
    ///
    /// Returns `ValidationError` listing every incomplete question.
    pub fn validate_complete(&self) -> Result<(), ValidationError> {
        let missing = self.missing_answers();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { missing })
        }
    }

    #[must_use]
    pub fn progress(&self) -> AttemptProgress {
        let inner = self.lock();
        let total = self.quiz.len();
        let answered = inner.attempt.completed_count(&self.quiz);
        AttemptProgress {
            total,
            answered,
            remaining: total - answered,
            is_submitted: inner.attempt.is_submitted(),
        }
    }

    #[must_use]
    pub fn result(&self) -> Option<AttemptResult> {
        self.lock().attempt.result().cloned()
    }

    /// Grading detail for a question, looked up by id.
    #[must_use]
    pub fn detail_for(&self, question_id: QuestionId) -> Option<QuestionDetail> {
        self.lock()
            .attempt
            .result()
            .and_then(|r| r.detail_for(question_id))
            .cloned()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.lock().completed_at
    }

    #[must_use]
    pub fn history_id(&self) -> Option<HistoryEntryId> {
        self.lock().history_id
    }

    /// Tear the session down. Responses that arrive afterwards are dropped.
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if !inner.disposed {
            debug!("disposing session for attempt {}", inner.attempt.id());
            inner.disposed = true;
        }
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Lock answers for grading and snapshot them in quiz order.
    pub(crate) fn begin_submission(
        &self,
    ) -> Result<(SubmissionGuard<'_>, Vec<AnswerSubmission>), SubmitError> {
        let mut inner = self.lock();
        if inner.disposed {
            return Err(SubmitError::Disposed);
        }
        if inner.attempt.is_submitted() {
            return Err(SubmitError::AlreadySubmitted);
        }
        if inner.submitting {
            return Err(SubmitError::InFlight);
        }
        let missing = inner.attempt.missing_answers(&self.quiz);
        if !missing.is_empty() {
            return Err(ValidationError { missing }.into());
        }
        let answers = inner
            .attempt
            .ordered_answers(&self.quiz)
            .into_iter()
            .map(|(question, answer)| AnswerSubmission {
                question_id: question.id(),
                answer: answer.clone(),
            })
            .collect();
        inner.submitting = true;
        Ok((SubmissionGuard { session: self }, answers))
    }

    pub(crate) fn claim_history_append(&self) -> Result<HistoryClaim, HistoryError> {
        let mut inner = self.lock();
        if let Some(id) = inner.history_id {
            return Ok(HistoryClaim::Recorded(id));
        }
        let (Some(result), Some(completed_at)) = (inner.attempt.result(), inner.completed_at)
        else {
            return Err(HistoryError::NotSubmitted);
        };
        if inner.history_appending {
            return Err(HistoryError::AppendInProgress);
        }
        let entry = HistoryEntry::from_result(&self.quiz, inner.attempt.id(), result, completed_at);
        inner.history_appending = true;
        Ok(HistoryClaim::Pending(entry))
    }

    pub(crate) fn complete_history_append(&self, id: Option<HistoryEntryId>) {
        let mut inner = self.lock();
        inner.history_appending = false;
        if id.is_some() {
            inner.history_id = id;
        }
    }
}

impl SessionInner {
    fn ensure_editable(&self) -> Result<(), AnswerError> {
        if self.disposed {
            return Err(AnswerError::Disposed);
        }
        if self.submitting {
            return Err(AnswerError::SubmissionInFlight);
        }
        Ok(())
    }
}

/// Marks a submission in flight; dropping it unlocks the answers again,
/// including when the submitting future is cancelled.
pub(crate) struct SubmissionGuard<'a> {
    session: &'a QuizAttemptSession,
}

impl SubmissionGuard<'_> {
    /// Apply the graded result unless the session was disposed meanwhile.
    pub(crate) fn finish(
        self,
        result: AttemptResult,
        completed_at: DateTime<Utc>,
    ) -> Result<AttemptResult, SubmitError> {
        let session = self.session;
        // Released before `self` drops and relocks.
        let mut inner = session.lock();
        if inner.disposed {
            return Err(SubmitError::Disposed);
        }
        inner
            .attempt
            .attach_result(&session.quiz, result.clone())
            .map_err(SubmitError::InvalidResult)?;
        inner.completed_at = Some(completed_at);
        drop(inner);
        Ok(result)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.session.is_disposed()
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.session.lock().submitting = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AttemptError, Question, QuestionKind};

    fn quiz() -> Arc<Quiz> {
        let questions = vec![
            Question::new(
                QuestionId::new(1),
                "Capital of France?",
                QuestionKind::MultipleChoice {
                    choices: vec!["Paris".into(), "Lyon".into()],
                },
            )
            .unwrap(),
            Question::new(QuestionId::new(2), "Describe a river.", QuestionKind::OpenEnded)
                .unwrap(),
        ];
        Arc::new(Quiz::new(QuizId::new(5), "Geography", None, questions).unwrap())
    }

    fn session() -> QuizAttemptSession {
        QuizAttemptSession::new(quiz(), AttemptId::new(10))
    }

    fn graded() -> AttemptResult {
        AttemptResult::new(
            2,
            2,
            Some(true),
            vec![
                QuestionDetail {
                    question_id: QuestionId::new(2),
                    correct: true,
                    correct_answer: None,
                },
                QuestionDetail {
                    question_id: QuestionId::new(1),
                    correct: true,
                    correct_answer: Some("Paris".into()),
                },
            ],
        )
        .unwrap()
    }

    fn answer_all(session: &QuizAttemptSession) {
        session
            .set_answer(QuestionId::new(2), Answer::open_ended("It flows."))
            .unwrap();
        session
            .set_answer(QuestionId::new(1), Answer::multiple_choice(0))
            .unwrap();
    }

    #[test]
    fn set_answer_overwrites_and_reports_previous() {
        let session = session();
        let q1 = QuestionId::new(1);

        assert_eq!(session.set_answer(q1, Answer::multiple_choice(1)).unwrap(), None);
        let previous = session.set_answer(q1, Answer::multiple_choice(0)).unwrap();

        assert_eq!(previous, Some(Answer::multiple_choice(1)));
        assert_eq!(session.answer(q1), Some(Answer::multiple_choice(0)));
    }

    #[test]
    fn mismatched_answers_are_rejected_without_change() {
        let session = session();

        let err = session
            .set_answer(QuestionId::new(1), Answer::open_ended("Paris"))
            .unwrap_err();
        assert!(matches!(
            err,
            AnswerError::Attempt(AttemptError::KindMismatch { .. })
        ));
        let err = session
            .set_answer(QuestionId::new(99), Answer::multiple_choice(0))
            .unwrap_err();
        assert!(matches!(err, AnswerError::Attempt(AttemptError::UnknownQuestion(_))));
        assert_eq!(session.progress().answered, 0);
    }

    #[test]
    fn validate_complete_lists_missing_in_quiz_order() {
        let session = session();
        session
            .set_answer(QuestionId::new(2), Answer::open_ended("   "))
            .unwrap();

        let err = session.validate_complete().unwrap_err();
        assert_eq!(err.missing, vec![QuestionId::new(1), QuestionId::new(2)]);

        answer_all(&session);
        assert!(session.validate_complete().is_ok());
        assert!(session.progress().is_ready_to_submit());
    }

    #[test]
    fn begin_submission_snapshots_in_quiz_order_and_locks_answers() {
        let session = session();
        answer_all(&session);

        let (guard, answers) = session.begin_submission().unwrap();
        let ids: Vec<_> = answers.iter().map(|a| a.question_id).collect();
        assert_eq!(ids, vec![QuestionId::new(1), QuestionId::new(2)]);

        assert!(session.is_submitting());
        assert!(matches!(
            session.set_answer(QuestionId::new(1), Answer::multiple_choice(1)),
            Err(AnswerError::SubmissionInFlight)
        ));
        assert!(matches!(session.begin_submission(), Err(SubmitError::InFlight)));

        drop(guard);
        assert!(!session.is_submitting());
        assert_eq!(session.state(), AttemptState::InProgress);
    }

    #[test]
    fn finishing_freezes_the_attempt() {
        let session = session();
        answer_all(&session);
        let (guard, _) = session.begin_submission().unwrap();
        guard.finish(graded(), quiz_core::time::fixed_now()).unwrap();

        assert_eq!(session.state(), AttemptState::Submitted);
        assert_eq!(
            session.detail_for(QuestionId::new(1)).unwrap().correct_answer.as_deref(),
            Some("Paris")
        );
        assert!(matches!(
            session.set_answer(QuestionId::new(1), Answer::multiple_choice(1)),
            Err(AnswerError::Attempt(AttemptError::Submitted))
        ));
        assert_eq!(session.answer(QuestionId::new(1)), Some(Answer::multiple_choice(0)));
        assert!(matches!(
            session.begin_submission(),
            Err(SubmitError::AlreadySubmitted)
        ));
    }

    #[test]
    fn result_arriving_after_dispose_is_discarded() {
        let session = session();
        answer_all(&session);
        let (guard, _) = session.begin_submission().unwrap();
        session.dispose();

        let err = guard.finish(graded(), quiz_core::time::fixed_now()).unwrap_err();
        assert!(matches!(err, SubmitError::Disposed));
        assert_eq!(session.result(), None);
        assert_eq!(session.state(), AttemptState::InProgress);
    }

    #[test]
    fn history_claim_is_exclusive() {
        let session = session();
        assert!(matches!(
            session.claim_history_append(),
            Err(HistoryError::NotSubmitted)
        ));

        answer_all(&session);
        let (guard, _) = session.begin_submission().unwrap();
        guard.finish(graded(), quiz_core::time::fixed_now()).unwrap();

        let Ok(HistoryClaim::Pending(entry)) = session.claim_history_append() else {
            panic!("expected a pending claim");
        };
        assert_eq!(entry.score(), 2);
        assert!(matches!(
            session.claim_history_append(),
            Err(HistoryError::AppendInProgress)
        ));

        session.complete_history_append(Some(7));
        assert!(matches!(
            session.claim_history_append(),
            Ok(HistoryClaim::Recorded(7))
        ));
    }
}
