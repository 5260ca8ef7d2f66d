//! Retention management for diagnostic files and archive artifacts
//!
//! Deletes files older than a retention period, judged by modification time.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;

use super::file_writer::DIAGNOSTICS_FILE_PREFIX;
use crate::logger::is_archive_file_name;

/// Default retention period for diagnostic files, in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// Clean up diagnostic files older than the default retention period
///
/// Returns the number of files deleted.
pub fn cleanup_old_diagnostics(dir: &Path) -> Result<usize> {
    cleanup_older_than(dir, DEFAULT_RETENTION_DAYS, |name| {
        name.starts_with(DIAGNOSTICS_FILE_PREFIX) && name.ends_with(".log")
    })
}

/// Clean up archive artifacts older than `retention_days`
///
/// Returns the number of files deleted.
pub fn cleanup_old_archives(dir: &Path, retention_days: u64) -> Result<usize> {
    cleanup_older_than(dir, retention_days, is_archive_file_name)
}

fn cleanup_older_than(
    dir: &Path,
    retention_days: u64,
    matches: impl Fn(&str) -> bool,
) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    // A retention period too large to represent keeps everything
    let Some(retention_secs) = retention_days.checked_mul(24 * 60 * 60) else {
        return Ok(0);
    };
    let Some(cutoff) = SystemTime::now().checked_sub(Duration::from_secs(retention_secs)) else {
        return Ok(0);
    };

    let mut deleted_count = 0;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if matches(name) => {}
            _ => continue,
        }

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff && fs::remove_file(&path).is_ok() {
                    deleted_count += 1;
                }
            }
        }
    }

    Ok(deleted_count)
}
