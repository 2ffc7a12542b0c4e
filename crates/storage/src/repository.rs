use async_trait::async_trait;
use quiz_core::model::HistoryEntry;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a history entry.
///
/// `i64` to match `SQLite` row ids.
pub type HistoryEntryId = i64;

/// A persisted history entry together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: HistoryEntryId,
    pub entry: HistoryEntry,
}

impl HistoryRow {
    #[must_use]
    pub fn new(id: HistoryEntryId, entry: HistoryEntry) -> Self {
        Self { id, entry }
    }
}

/// Append-only log of graded attempts.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Append an entry and return its id.
    ///
    /// Appends are atomic with respect to each other.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_entry(&self, entry: &HistoryEntry) -> Result<HistoryEntryId, StorageError>;

    /// Fetch a single entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError>;

    /// Most recent first (by completion time, then by id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryRow>, StorageError>;

    /// Remove every entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on write failures.
    async fn clear(&self) -> Result<u64, StorageError>;
}

#[derive(Default)]
struct InMemoryHistory {
    next_id: HistoryEntryId,
    rows: Vec<HistoryRow>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    history: Arc<Mutex<InMemoryHistory>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_recent_first(rows: &mut [HistoryRow]) {
    rows.sort_by(|a, b| {
        b.entry
            .completed_at()
            .cmp(&a.entry.completed_at())
            .then(b.id.cmp(&a.id))
    });
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append_entry(&self, entry: &HistoryEntry) -> Result<HistoryEntryId, StorageError> {
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.next_id += 1;
        let id = guard.next_id;
        guard.rows.push(HistoryRow::new(id, entry.clone()));
        Ok(id)
    }

    async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .rows
            .iter()
            .find(|row| row.id == id)
            .map(|row| row.entry.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryRow>, StorageError> {
        let guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows = guard.rows.clone();
        drop(guard);

        sort_recent_first(&mut rows);
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let mut guard = self
            .history
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let removed = guard.rows.len() as u64;
        guard.rows.clear();
        Ok(removed)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let history: Arc<dyn HistoryRepository> = Arc::new(InMemoryRepository::new());
        Self { history }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{AttemptId, QuizId};
    use quiz_core::time::fixed_now;

    fn entry(attempt: u64, minutes_ago: i64) -> HistoryEntry {
        HistoryEntry::from_persisted(
            QuizId::new(1),
            AttemptId::new(attempt),
            "Capitals".into(),
            fixed_now() - Duration::minutes(minutes_ago),
            1,
            2,
            Some(false),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn lists_most_recent_first() {
        let repo = InMemoryRepository::new();
        let older = repo.append_entry(&entry(1, 30)).await.unwrap();
        let newer = repo.append_entry(&entry(2, 5)).await.unwrap();
        // Same timestamp as `newer`: the later append wins the tie.
        let tie = repo.append_entry(&entry(3, 5)).await.unwrap();

        let rows = repo.list_entries(10).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![tie, newer, older]);

        let limited = repo.list_entries(1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].entry.attempt_id(), AttemptId::new(3));
    }

    #[tokio::test]
    async fn clear_removes_everything_but_ids_keep_growing() {
        let repo = InMemoryRepository::new();
        let first = repo.append_entry(&entry(1, 0)).await.unwrap();
        repo.append_entry(&entry(2, 0)).await.unwrap();

        assert_eq!(repo.clear().await.unwrap(), 2);
        assert!(repo.list_entries(10).await.unwrap().is_empty());
        assert!(matches!(
            repo.get_entry(first).await,
            Err(StorageError::NotFound)
        ));

        let next = repo.append_entry(&entry(3, 0)).await.unwrap();
        assert!(next > first);
    }

    #[tokio::test]
    async fn concurrent_appends_all_land() {
        let repo = InMemoryRepository::new();
        let mut handles = Vec::new();
        for attempt in 1..=16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.append_entry(&entry(attempt, 0)).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap());
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16);
        assert_eq!(repo.list_entries(100).await.unwrap().len(), 16);
    }
}
