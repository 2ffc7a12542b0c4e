use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{AttemptId, HistoryEntry, QuizId};
use storage::repository::{HistoryEntryId, HistoryRepository, HistoryRow, InMemoryRepository};

use crate::error::HistoryError;

/// Presentation-agnostic list item for a recorded attempt.
///
/// No pre-formatted strings; the UI formats timestamps and scores itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryListItem {
    pub id: HistoryEntryId,
    pub quiz_id: QuizId,
    pub attempt_id: AttemptId,
    pub title: String,
    pub completed_at: DateTime<Utc>,
    pub score: u32,
    pub max_score: u32,
    pub passed: Option<bool>,
}

impl HistoryListItem {
    #[must_use]
    pub fn from_entry(id: HistoryEntryId, entry: &HistoryEntry) -> Self {
        Self {
            id,
            quiz_id: entry.quiz_id(),
            attempt_id: entry.attempt_id(),
            title: entry.title().to_owned(),
            completed_at: entry.completed_at(),
            score: entry.score(),
            max_score: entry.max_score(),
            passed: entry.passed(),
        }
    }
}

impl From<&HistoryRow> for HistoryListItem {
    fn from(row: &HistoryRow) -> Self {
        Self::from_entry(row.id, &row.entry)
    }
}

/// Read side of the local attempt history.
#[derive(Clone)]
pub struct QuizHistoryService {
    history: Arc<dyn HistoryRepository>,
}

impl QuizHistoryService {
    #[must_use]
    pub fn new(history: Arc<dyn HistoryRepository>) -> Self {
        Self { history }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Most recent attempts first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list(&self, limit: u32) -> Result<Vec<HistoryListItem>, HistoryError> {
        let rows = self.history.list_entries(limit).await?;
        Ok(rows.iter().map(HistoryListItem::from).collect())
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage`, wrapping `StorageError::NotFound` for
    /// an unknown id.
    pub async fn get(&self, id: HistoryEntryId) -> Result<HistoryEntry, HistoryError> {
        Ok(self.history.get_entry(id).await?)
    }

    /// Remove every recorded attempt. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn clear(&self) -> Result<u64, HistoryError> {
        let removed = self.history.clear().await?;
        log::info!("cleared {removed} history entries");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use quiz_core::time::fixed_now;
    use storage::repository::StorageError;

    fn entry(quiz: u64, attempt: u64, completed_at: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry::from_persisted(
            QuizId::new(quiz),
            AttemptId::new(attempt),
            format!("Quiz {quiz}"),
            completed_at,
            3,
            4,
            Some(true),
        )
        .unwrap()
    }

    #[test]
    fn list_item_is_presentation_agnostic() {
        let now = fixed_now();
        let item = HistoryListItem::from_entry(42, &entry(1, 7, now));

        assert_eq!(item.id, 42);
        assert_eq!(item.attempt_id, AttemptId::new(7));
        assert_eq!(item.completed_at, now);
        assert_eq!((item.score, item.max_score), (3, 4));
    }

    #[tokio::test]
    async fn list_returns_most_recent_first() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = fixed_now();
        let older = repo
            .append_entry(&entry(1, 1, now - Duration::hours(3)))
            .await
            .unwrap();
        let newer = repo.append_entry(&entry(2, 2, now)).await.unwrap();

        let svc = QuizHistoryService::new(repo);
        let items = svc.list(10).await.unwrap();

        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert_eq!(items[0].title, "Quiz 2");
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let svc = QuizHistoryService::in_memory();
        assert_eq!(svc.clear().await.unwrap(), 0);
        assert!(matches!(
            svc.get(1).await,
            Err(HistoryError::Storage(StorageError::NotFound))
        ));
    }
}
