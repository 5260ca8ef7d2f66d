//! Error kinds surfaced by the logging engine

use std::path::PathBuf;

use crate::store::StoreError;

/// Failures inside the persistence and archival path
///
/// None of these reach callers of `Logger::log`; they are reported on the
/// diagnostic channel and contained by the facade.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("Failed to write to log store: {0}")]
    PersistenceWrite(#[source] StoreError),

    #[error("Failed to load persisted logs: {0}")]
    PersistenceLoad(#[source] StoreError),

    #[error("Failed to write archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read archive {path}: {message}")]
    ArchiveRead { path: PathBuf, message: String },

    #[error("Logger worker has stopped")]
    WorkerStopped,
}

pub type Result<T> = std::result::Result<T, LoggerError>;
