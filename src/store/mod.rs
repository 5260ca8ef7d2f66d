//! Persistence backends for log entries
//!
//! The engine only depends on the `PersistenceBackend` trait; any durable
//! store offering upsert-by-id, bulk delete and newest-first loading fits.

mod json_file;
mod memory;

pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;

use crate::logger::{EntryId, LogEntry};

/// Errors reported by a persistence backend
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode or decode log store: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Log store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for log entries
pub trait PersistenceBackend: Send + Sync {
    /// Load at most `limit` entries, newest first
    fn load_recent(&self, limit: usize) -> StoreResult<Vec<LogEntry>>;

    /// Insert entries whose id is absent and overwrite those already present
    fn upsert(&self, entries: &[LogEntry]) -> StoreResult<()>;

    /// Remove specific entries by id; unknown ids are ignored
    fn delete(&self, ids: &[EntryId]) -> StoreResult<()>;

    /// Remove every persisted entry
    fn delete_all(&self) -> StoreResult<()>;
}
