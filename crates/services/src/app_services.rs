use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::api::{HttpQuizApi, QuizApi, QuizApiConfig};
use crate::error::AppServicesError;
use crate::session::{QuizHistoryService, QuizSessionService};

/// Assembles app-facing services over one storage backend and one API client.
#[derive(Clone)]
pub struct AppServices {
    sessions: Arc<QuizSessionService>,
    history: Arc<QuizHistoryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP quiz API.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// HTTP client cannot be built.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        api_config: QuizApiConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let api: Arc<dyn QuizApi> = Arc::new(HttpQuizApi::new(api_config)?);
        Ok(Self::from_parts(clock, &storage, api))
    }

    /// Wire services from an existing storage and API; used by tests and
    /// alternative front ends.
    #[must_use]
    pub fn from_parts(clock: Clock, storage: &Storage, api: Arc<dyn QuizApi>) -> Self {
        let sessions = Arc::new(QuizSessionService::new(
            clock,
            api,
            Arc::clone(&storage.history),
        ));
        let history = Arc::new(QuizHistoryService::new(Arc::clone(&storage.history)));
        Self { sessions, history }
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<QuizSessionService> {
        Arc::clone(&self.sessions)
    }

    #[must_use]
    pub fn history(&self) -> Arc<QuizHistoryService> {
        Arc::clone(&self.history)
    }
}
