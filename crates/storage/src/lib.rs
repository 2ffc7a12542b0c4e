#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    HistoryEntryId, HistoryRepository, HistoryRow, InMemoryRepository, Storage, StorageError,
};
