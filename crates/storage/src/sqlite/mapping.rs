use quiz_core::model::{AttemptId, HistoryEntry, QuizId};
use sqlx::Row;

use crate::repository::{HistoryRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_history_entry(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<HistoryEntry, StorageError> {
    let quiz_id = QuizId::new(i64_to_u64(
        "quiz_id",
        row.try_get::<i64, _>("quiz_id").map_err(ser)?,
    )?);
    let attempt_id = AttemptId::new(i64_to_u64(
        "attempt_id",
        row.try_get::<i64, _>("attempt_id").map_err(ser)?,
    )?);
    let title: String = row.try_get("title").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let max_score = u32_from_i64(
        "max_score",
        row.try_get::<i64, _>("max_score").map_err(ser)?,
    )?;
    let passed: Option<bool> = row.try_get("passed").map_err(ser)?;

    HistoryEntry::from_persisted(
        quiz_id,
        attempt_id,
        title,
        completed_at,
        score,
        max_score,
        passed,
    )
    .map_err(ser)
}

pub(crate) fn map_history_row(row: &sqlx::sqlite::SqliteRow) -> Result<HistoryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    Ok(HistoryRow::new(id, map_history_entry(row)?))
}
