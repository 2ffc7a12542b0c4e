use quiz_core::model::HistoryEntry;

use super::SqliteRepository;
use super::mapping::{id_to_i64, map_history_entry, map_history_row};
use crate::repository::{HistoryEntryId, HistoryRepository, HistoryRow, StorageError};

#[async_trait::async_trait]
impl HistoryRepository for SqliteRepository {
    async fn append_entry(&self, entry: &HistoryEntry) -> Result<HistoryEntryId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO quiz_history (
                    quiz_id, attempt_id, title, completed_at, score, max_score, passed
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(id_to_i64("quiz_id", entry.quiz_id().value())?)
        .bind(id_to_i64("attempt_id", entry.attempt_id().value())?)
        .bind(entry.title())
        .bind(entry.completed_at())
        .bind(i64::from(entry.score()))
        .bind(i64::from(entry.max_score()))
        .bind(entry.passed())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_entry(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
        let row = sqlx::query(
            r"
                SELECT quiz_id, attempt_id, title, completed_at, score, max_score, passed
                FROM quiz_history
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        map_history_entry(&row)
    }

    async fn list_entries(&self, limit: u32) -> Result<Vec<HistoryRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, quiz_id, attempt_id, title, completed_at, score, max_score, passed
                FROM quiz_history
                ORDER BY completed_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_history_row(&row)?);
        }
        Ok(out)
    }

    async fn clear(&self) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM quiz_history")
            .execute(self.pool())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        log::info!("cleared {} history entries", res.rows_affected());
        Ok(res.rows_affected())
    }
}
