//! Archive artifacts
//!
//! An archive is a JSON array of `LogEntry` values written to its own file.
//! Each element carries `id`, `timestamp` (RFC 3339, sub-second precision),
//! `level` (lowercase name), `category`, `message`, `session_id`,
//! `file_name`, `function_name` and `line_number`, so every field round-trips.
//!
//! Files are named `<kind>-YYYY-MM-DD_HH-MM-SS.mmm-<seq>.json`. The sequence
//! number and exclusive creation keep rapid successive archives from
//! overwriting each other.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use super::entry::LogEntry;
use super::error::{LoggerError, Result};

const ARCHIVE_EXTENSION: &str = "json";
const MAX_NAME_ATTEMPTS: u32 = 64;

/// Why an archive was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Full snapshot taken by a time-triggered rotation
    Rotation,
    /// Oldest entries evicted by the size limit
    Overflow,
    /// On-demand crash capture
    Crash,
}

impl ArchiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Rotation => "rotation",
            ArchiveKind::Overflow => "overflow",
            ArchiveKind::Crash => "crash",
        }
    }

    fn from_file_name(name: &str) -> Option<Self> {
        [ArchiveKind::Rotation, ArchiveKind::Overflow, ArchiveKind::Crash]
            .into_iter()
            .find(|kind| {
                name.strip_prefix(kind.as_str())
                    .is_some_and(|rest| rest.starts_with('-'))
            })
    }
}

/// Writes archive artifacts into one directory
#[derive(Debug)]
pub struct ArchiveWriter {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl ArchiveWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Directory archives are written to
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(kind: ArchiveKind, at: DateTime<Utc>, sequence: u64) -> String {
        format!(
            "{}-{}-{:04}.{}",
            kind.as_str(),
            at.format("%Y-%m-%d_%H-%M-%S%.3f"),
            sequence,
            ARCHIVE_EXTENSION
        )
    }

    /// Serialize `entries` into a new archive named after `at`
    pub fn write(
        &self,
        kind: ArchiveKind,
        at: DateTime<Utc>,
        entries: &[LogEntry],
    ) -> Result<PathBuf> {
        let content = serde_json::to_vec_pretty(entries).map_err(|e| LoggerError::ArchiveWrite {
            path: self.dir.clone(),
            source: e.into(),
        })?;

        fs::create_dir_all(&self.dir).map_err(|source| LoggerError::ArchiveWrite {
            path: self.dir.clone(),
            source,
        })?;

        let mut attempts = 0;
        loop {
            let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
            let path = self.dir.join(Self::file_name(kind, at, sequence));

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    return match file.write_all(&content).and_then(|_| file.sync_all()) {
                        Ok(()) => Ok(path),
                        Err(source) => Err(LoggerError::ArchiveWrite { path, source }),
                    };
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    attempts += 1;
                    if attempts >= MAX_NAME_ATTEMPTS {
                        return Err(LoggerError::ArchiveWrite { path, source: e });
                    }
                }
                Err(source) => return Err(LoggerError::ArchiveWrite { path, source }),
            }
        }
    }
}

/// Read back the entries stored in an archive
pub fn read_archive(path: &Path) -> Result<Vec<LogEntry>> {
    let content = fs::read_to_string(path).map_err(|e| LoggerError::ArchiveRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| LoggerError::ArchiveRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// List archives in `dir`, optionally restricted to one kind, sorted by name
///
/// Names embed the archive instant, so the result is chronological per kind.
pub fn list_archives(dir: &Path, kind: Option<ArchiveKind>) -> std::io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION) {
            continue;
        }
        let Some(found) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ArchiveKind::from_file_name)
        else {
            continue;
        };
        if kind.map_or(true, |k| k == found) {
            archives.push(path);
        }
    }

    archives.sort();
    Ok(archives)
}

/// Check whether a file name looks like an archive artifact
pub fn is_archive_file_name(name: &str) -> bool {
    name.ends_with(&format!(".{}", ARCHIVE_EXTENSION)) && ArchiveKind::from_file_name(name).is_some()
}
