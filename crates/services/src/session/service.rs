use std::sync::Arc;

use log::{debug, info, warn};
use quiz_core::model::{AttemptId, AttemptResult, QuizId};
use storage::repository::{HistoryEntryId, HistoryRepository};

use super::attempt_session::{AttemptTicket, HistoryClaim, QuizAttemptSession};
use crate::Clock;
use crate::api::{AttemptSummary, QuizApi, QuizListing};
use crate::error::{ApiError, HistoryError, LoadError, RestartError, SubmitError};

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub result: AttemptResult,
    /// `None` when grading succeeded but the local history append failed;
    /// `QuizSessionService::finalize_history` retries it.
    pub history_id: Option<HistoryEntryId>,
}

/// Drives quiz attempts against the remote API and records graded attempts
/// in local history.
#[derive(Clone)]
pub struct QuizSessionService {
    clock: Clock,
    api: Arc<dyn QuizApi>,
    history: Arc<dyn HistoryRepository>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(clock: Clock, api: Arc<dyn QuizApi>, history: Arc<dyn HistoryRepository>) -> Self {
        Self {
            clock,
            api,
            history,
        }
    }

    /// Fetch the quiz and, unless `attempt_id` is given, start a fresh
    /// attempt. Both requests run concurrently.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if either request fails; no session is built.
    pub async fn load(
        &self,
        quiz_id: QuizId,
        attempt_id: Option<AttemptId>,
    ) -> Result<QuizAttemptSession, LoadError> {
        let quiz = async {
            self.api
                .fetch_quiz(quiz_id)
                .await
                .map_err(|source| LoadError::Quiz { quiz_id, source })
        };
        let attempt = async {
            match attempt_id {
                Some(id) => Ok(id),
                None => self
                    .api
                    .start_attempt(quiz_id)
                    .await
                    .map_err(|source| LoadError::Attempt { quiz_id, source }),
            }
        };
        let (quiz, attempt_id) = futures::try_join!(quiz, attempt)?;
        info!(
            "loaded quiz {quiz_id} ({} questions), attempt {attempt_id}",
            quiz.len()
        );
        Ok(QuizAttemptSession::new(Arc::new(quiz), attempt_id))
    }

    /// Open the attempt a ticket points to.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the quiz cannot be fetched.
    pub async fn resume(&self, ticket: AttemptTicket) -> Result<QuizAttemptSession, LoadError> {
        self.load(ticket.quiz_id, Some(ticket.attempt_id)).await
    }

    /// Send the answers for grading and record the graded attempt.
    ///
    /// Answers are validated before any request is made. While the request
    /// is pending the answers are locked and a second `submit` is refused.
    ///
    /// # Errors
    ///
    /// Returns `SubmitError`; on every error the attempt stays in progress
    /// (or stays graded, for `AlreadySubmitted`) and `submit` may be retried.
    pub async fn submit(&self, session: &QuizAttemptSession) -> Result<SubmitOutcome, SubmitError> {
        let (guard, answers) = session.begin_submission()?;
        let quiz_id = session.quiz_id();
        let attempt_id = session.attempt_id();
        debug!("submitting {} answers for attempt {attempt_id}", answers.len());

        let graded = self.api.submit_answers(quiz_id, attempt_id, &answers).await;
        let result = match graded {
            Ok(result) => result,
            Err(err) if guard.is_disposed() => {
                debug!("dropping grading failure for disposed attempt {attempt_id}: {err}");
                return Err(SubmitError::Disposed);
            }
            Err(err) => {
                warn!("grading attempt {attempt_id} failed: {err}");
                return Err(err.into());
            }
        };

        let result = guard
            .finish(result, self.clock.now())
            .inspect_err(|err| match err {
                SubmitError::Disposed => {
                    debug!("dropping result for disposed attempt {attempt_id}");
                }
                other => warn!("rejected result for attempt {attempt_id}: {other}"),
            })?;
        info!(
            "attempt {attempt_id} graded {}/{}",
            result.total_score(),
            result.max_score()
        );

        let history_id = match self.finalize_history(session).await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("failed to record history for attempt {attempt_id}: {err}");
                None
            }
        };
        Ok(SubmitOutcome { result, history_id })
    }

    /// Start a new attempt for the same quiz.
    ///
    /// The current session is not modified; open the returned ticket with
    /// `resume`.
    ///
    /// # Errors
    ///
    /// Returns `RestartError` if the API refuses to create the attempt.
    pub async fn restart(&self, session: &QuizAttemptSession) -> Result<AttemptTicket, RestartError> {
        let quiz_id = session.quiz_id();
        let attempt_id = self
            .api
            .start_attempt(quiz_id)
            .await
            .map_err(|source| RestartError::Api { quiz_id, source })?;
        info!(
            "restarted quiz {quiz_id}: attempt {} -> {attempt_id}",
            session.attempt_id()
        );
        Ok(AttemptTicket {
            quiz_id,
            attempt_id,
        })
    }

    /// Record a graded attempt in history, once.
    ///
    /// Returns the stored id straight away when the attempt is already
    /// recorded, so calling it again is safe.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::NotSubmitted` before grading,
    /// `HistoryError::AppendInProgress` while another append runs, and
    /// `HistoryError::Storage` if the repository fails.
    pub async fn finalize_history(
        &self,
        session: &QuizAttemptSession,
    ) -> Result<HistoryEntryId, HistoryError> {
        let entry = match session.claim_history_append()? {
            HistoryClaim::Recorded(id) => return Ok(id),
            HistoryClaim::Pending(entry) => entry,
        };
        match self.history.append_entry(&entry).await {
            Ok(id) => {
                session.complete_history_append(Some(id));
                debug!("recorded attempt {} as history {id}", entry.attempt_id());
                Ok(id)
            }
            Err(err) => {
                session.complete_history_append(None);
                Err(err.into())
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn list_quizzes(&self) -> Result<Vec<QuizListing>, ApiError> {
        self.api.list_quizzes().await
    }

    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    pub async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptSummary>, ApiError> {
        self.api.list_attempts(quiz_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use quiz_core::model::{
        Answer, AttemptState, HistoryEntry, Question, QuestionDetail, QuestionId, QuestionKind,
        Quiz,
    };
    use quiz_core::time::fixed_now;
    use storage::repository::{HistoryRow, InMemoryRepository, StorageError};

    use crate::api::{AnswerSubmission, StatusCode};

    struct ScriptedApi {
        quiz: Quiz,
        next_attempt: AtomicUsize,
        fail_start: bool,
        grades: Mutex<VecDeque<Result<AttemptResult, ApiError>>>,
        submitted: Mutex<Vec<Vec<AnswerSubmission>>>,
    }

    impl ScriptedApi {
        fn new(quiz: Quiz) -> Self {
            Self {
                quiz,
                next_attempt: AtomicUsize::new(100),
                fail_start: false,
                grades: Mutex::new(VecDeque::new()),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn grade(self, outcome: Result<AttemptResult, ApiError>) -> Self {
            self.grades.lock().unwrap().push_back(outcome);
            self
        }

        fn submit_calls(&self) -> usize {
            self.submitted.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl QuizApi for ScriptedApi {
        async fn list_quizzes(&self) -> Result<Vec<QuizListing>, ApiError> {
            Ok(vec![QuizListing {
                quiz_id: self.quiz.id(),
                title: self.quiz.title().to_owned(),
                description: None,
            }])
        }

        async fn fetch_quiz(&self, quiz_id: QuizId) -> Result<Quiz, ApiError> {
            if quiz_id == self.quiz.id() {
                Ok(self.quiz.clone())
            } else {
                Err(ApiError::HttpStatus(StatusCode::NOT_FOUND))
            }
        }

        async fn start_attempt(&self, _quiz_id: QuizId) -> Result<AttemptId, ApiError> {
            if self.fail_start {
                return Err(ApiError::HttpStatus(StatusCode::INTERNAL_SERVER_ERROR));
            }
            let next = self.next_attempt.fetch_add(1, Ordering::SeqCst);
            Ok(AttemptId::new(next as u64))
        }

        async fn list_attempts(&self, _quiz_id: QuizId) -> Result<Vec<AttemptSummary>, ApiError> {
            Ok(Vec::new())
        }

        async fn submit_answers(
            &self,
            _quiz_id: QuizId,
            _attempt_id: AttemptId,
            answers: &[AnswerSubmission],
        ) -> Result<AttemptResult, ApiError> {
            self.submitted.lock().unwrap().push(answers.to_vec());
            tokio::task::yield_now().await;
            self.grades
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ApiError::InvalidResponse("no grade scripted".into())))
        }
    }

    /// Fails the first `failures` appends, then delegates.
    struct FlakyHistory {
        inner: InMemoryRepository,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl HistoryRepository for FlakyHistory {
        async fn append_entry(&self, entry: &HistoryEntry) -> Result<HistoryEntryId, StorageError> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(StorageError::Connection("disk full".into()));
            }
            self.inner.append_entry(entry).await
        }

        async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
            self.inner.get_entry(id).await
        }

        async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryRow>, StorageError> {
            self.inner.list_entries(limit).await
        }

        async fn clear(&self) -> Result<u64, StorageError> {
            self.inner.clear().await
        }
    }

    fn two_mcq_quiz() -> Quiz {
        let mcq = |id: u64, text: &str| {
            Question::new(
                QuestionId::new(id),
                text,
                QuestionKind::MultipleChoice {
                    choices: vec!["A".into(), "B".into(), "C".into()],
                },
            )
            .unwrap()
        };
        Quiz::new(
            QuizId::new(1),
            "Basics",
            None,
            vec![mcq(10, "First?"), mcq(11, "Second?")],
        )
        .unwrap()
    }

    fn full_marks() -> AttemptResult {
        AttemptResult::new(
            2,
            2,
            Some(true),
            vec![
                QuestionDetail {
                    question_id: QuestionId::new(10),
                    correct: true,
                    correct_answer: Some("A".into()),
                },
                QuestionDetail {
                    question_id: QuestionId::new(11),
                    correct: true,
                    correct_answer: Some("B".into()),
                },
            ],
        )
        .unwrap()
    }

    fn answer_both(session: &QuizAttemptSession) {
        session
            .set_answer(QuestionId::new(10), Answer::multiple_choice(0))
            .unwrap();
        session
            .set_answer(QuestionId::new(11), Answer::multiple_choice(1))
            .unwrap();
    }

    fn service(api: Arc<ScriptedApi>, history: Arc<dyn HistoryRepository>) -> QuizSessionService {
        QuizSessionService::new(Clock::fixed(fixed_now()), api, history)
    }

    #[tokio::test]
    async fn two_question_quiz_is_graded_and_recorded_once() {
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(full_marks())));
        let history = Arc::new(InMemoryRepository::new());
        let svc = service(Arc::clone(&api), history.clone());

        let session = svc.load(QuizId::new(1), None).await.unwrap();
        assert_eq!(session.attempt_id(), AttemptId::new(100));
        answer_both(&session);

        let outcome = svc.submit(&session).await.unwrap();

        assert_eq!(outcome.result.total_score(), 2);
        assert_eq!(outcome.result.max_score(), 2);
        assert_eq!(session.state(), AttemptState::Submitted);
        let rows = history.list_entries(10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(Some(rows[0].id), outcome.history_id);
        assert_eq!(rows[0].entry.completed_at(), fixed_now());
        assert_eq!(rows[0].entry.passed(), Some(true));
    }

    #[tokio::test]
    async fn incomplete_submission_never_reaches_the_api() {
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(full_marks())));
        let svc = service(Arc::clone(&api), Arc::new(InMemoryRepository::new()));
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        session
            .set_answer(QuestionId::new(10), Answer::multiple_choice(0))
            .unwrap();

        let err = svc.submit(&session).await.unwrap_err();

        let SubmitError::Incomplete(validation) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(validation.missing, vec![QuestionId::new(11)]);
        assert_eq!(api.submit_calls(), 0);
        assert_eq!(session.state(), AttemptState::InProgress);
    }

    #[tokio::test]
    async fn timed_out_submission_can_be_retried() {
        let api = Arc::new(
            ScriptedApi::new(two_mcq_quiz())
                .grade(Err(ApiError::HttpStatus(StatusCode::GATEWAY_TIMEOUT)))
                .grade(Ok(full_marks())),
        );
        let history = Arc::new(InMemoryRepository::new());
        let svc = service(Arc::clone(&api), history.clone());
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        answer_both(&session);

        let err = svc.submit(&session).await.unwrap_err();
        assert!(matches!(err, SubmitError::Api(ApiError::HttpStatus(_))));
        assert_eq!(session.state(), AttemptState::InProgress);
        assert_eq!(session.answer(QuestionId::new(11)), Some(Answer::multiple_choice(1)));
        assert!(history.list_entries(10).await.unwrap().is_empty());

        svc.submit(&session).await.unwrap();
        assert_eq!(api.submit_calls(), 2);
        assert_eq!(history.list_entries(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_submit_is_rejected() {
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(full_marks())));
        let history = Arc::new(InMemoryRepository::new());
        let svc = service(Arc::clone(&api), history.clone());
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        answer_both(&session);

        let (first, second) = tokio::join!(svc.submit(&session), svc.submit(&session));

        assert!(first.is_ok());
        assert!(matches!(second, Err(SubmitError::InFlight)));
        assert_eq!(api.submit_calls(), 1);
        assert_eq!(history.list_entries(10).await.unwrap().len(), 1);
        assert!(matches!(
            svc.submit(&session).await,
            Err(SubmitError::AlreadySubmitted)
        ));
    }

    #[tokio::test]
    async fn result_after_dispose_is_discarded() {
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(full_marks())));
        let history = Arc::new(InMemoryRepository::new());
        let svc = service(Arc::clone(&api), history.clone());
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        answer_both(&session);

        let (outcome, ()) = tokio::join!(svc.submit(&session), async { session.dispose() });

        assert!(matches!(outcome, Err(SubmitError::Disposed)));
        assert_eq!(session.result(), None);
        assert!(history.list_entries(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn result_missing_a_question_is_rejected() {
        let partial = AttemptResult::new(
            1,
            2,
            None,
            vec![QuestionDetail {
                question_id: QuestionId::new(10),
                correct: true,
                correct_answer: None,
            }],
        )
        .unwrap();
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(partial)));
        let svc = service(Arc::clone(&api), Arc::new(InMemoryRepository::new()));
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        answer_both(&session);

        let err = svc.submit(&session).await.unwrap_err();

        assert!(matches!(err, SubmitError::InvalidResult(_)));
        assert_eq!(session.state(), AttemptState::InProgress);
        assert!(!session.is_submitting());
    }

    #[tokio::test]
    async fn failed_history_append_is_finalized_later_without_duplicates() {
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(full_marks())));
        let history = Arc::new(FlakyHistory {
            inner: InMemoryRepository::new(),
            failures: AtomicUsize::new(1),
        });
        let svc = service(Arc::clone(&api), history.clone());
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        answer_both(&session);

        let outcome = svc.submit(&session).await.unwrap();
        assert_eq!(outcome.history_id, None);
        assert_eq!(session.state(), AttemptState::Submitted);

        let id = svc.finalize_history(&session).await.unwrap();
        let again = svc.finalize_history(&session).await.unwrap();

        assert_eq!(id, again);
        assert_eq!(session.history_id(), Some(id));
        assert_eq!(history.list_entries(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restart_leaves_the_graded_session_alone() {
        let api = Arc::new(ScriptedApi::new(two_mcq_quiz()).grade(Ok(full_marks())));
        let svc = service(Arc::clone(&api), Arc::new(InMemoryRepository::new()));
        let session = svc.load(QuizId::new(1), None).await.unwrap();
        answer_both(&session);
        svc.submit(&session).await.unwrap();

        let ticket = svc.restart(&session).await.unwrap();
        assert_eq!(ticket.quiz_id, QuizId::new(1));
        assert_ne!(ticket.attempt_id, session.attempt_id());
        assert_eq!(session.result(), Some(full_marks()));

        let fresh = svc.resume(ticket).await.unwrap();
        assert_eq!(fresh.attempt_id(), ticket.attempt_id);
        assert_eq!(fresh.state(), AttemptState::InProgress);
        assert_eq!(fresh.progress().answered, 0);
    }

    #[tokio::test]
    async fn load_failures_are_typed() {
        let mut scripted = ScriptedApi::new(two_mcq_quiz());
        scripted.fail_start = true;
        let svc = service(Arc::new(scripted), Arc::new(InMemoryRepository::new()));

        assert!(matches!(
            svc.load(QuizId::new(1), None).await,
            Err(LoadError::Attempt { .. })
        ));
        assert!(matches!(
            svc.load(QuizId::new(2), Some(AttemptId::new(5))).await,
            Err(LoadError::Quiz { .. })
        ));
        let resumed = svc.load(QuizId::new(1), Some(AttemptId::new(5))).await.unwrap();
        assert_eq!(resumed.attempt_id(), AttemptId::new(5));

        let err = svc.restart(&resumed).await.unwrap_err();
        assert!(matches!(err, RestartError::Api { .. }));
    }
}
