//! JSON file persistence for log entries
//!
//! Keeps every persisted entry in a single JSON array, rewritten atomically
//! (temp file + rename) on each mutation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::friendly_io_error_message;
use crate::logger::{EntryId, LogEntry};

use super::{PersistenceBackend, StoreError, StoreResult};

/// File-backed store
#[derive(Debug)]
pub struct JsonFileBackend {
    store_path: PathBuf,
    /// Serializes read-modify-write cycles on the file
    lock: Mutex<()>,
}

impl JsonFileBackend {
    /// Create a store backed by the given file
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Get the path to the store file
    pub fn path(&self) -> &Path {
        &self.store_path
    }

    fn io_error(&self, source: std::io::Error, context: &str) -> StoreError {
        StoreError::Io {
            message: friendly_io_error_message(&source, context),
            source,
        }
    }

    /// Load all entries in stored order
    fn load_all(&self) -> StoreResult<Vec<LogEntry>> {
        if !self.store_path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.store_path)
            .map_err(|e| self.io_error(e, "Failed to read log store"))?;

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the file content with `entries`
    fn save_all(&self, entries: &[LogEntry]) -> StoreResult<()> {
        if let Some(parent) = self.store_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| self.io_error(e, "Failed to create log store directory"))?;
            }
        }

        let content = serde_json::to_string(entries)?;
        let tmp_path = self.store_path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)
            .map_err(|e| self.io_error(e, "Failed to write log store"))?;
        std::fs::rename(&tmp_path, &self.store_path)
            .map_err(|e| self.io_error(e, "Failed to replace log store"))?;

        Ok(())
    }

    fn guard(&self) -> StoreResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl PersistenceBackend for JsonFileBackend {
    fn load_recent(&self, limit: usize) -> StoreResult<Vec<LogEntry>> {
        let _guard = self.guard()?;
        let mut entries = self.load_all()?;

        // Later insertions win timestamp ties
        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    fn upsert(&self, entries: &[LogEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let _guard = self.guard()?;
        let mut stored = self.load_all()?;
        let mut positions: HashMap<EntryId, usize> = stored
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();

        for entry in entries {
            match positions.get(&entry.id) {
                Some(&i) => stored[i] = entry.clone(),
                None => {
                    positions.insert(entry.id, stored.len());
                    stored.push(entry.clone());
                }
            }
        }

        self.save_all(&stored)
    }

    fn delete(&self, ids: &[EntryId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let _guard = self.guard()?;
        let mut stored = self.load_all()?;
        let original_count = stored.len();
        stored.retain(|e| !ids.contains(&e.id));

        if stored.len() != original_count {
            self.save_all(&stored)?;
        }
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<()> {
        let _guard = self.guard()?;
        self.save_all(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogCategory, LogLevel, SiteInfo};
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_store(temp_dir: &TempDir) -> JsonFileBackend {
        JsonFileBackend::new(temp_dir.path().join("logs.json"))
    }

    fn entry(offset_secs: i64, message: &str) -> LogEntry {
        LogEntry::new(
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap() + Duration::seconds(offset_secs),
            LogLevel::Info,
            LogCategory::general(),
            message,
            Uuid::nil(),
            SiteInfo::new("main.rs", "main", 1),
        )
    }

    #[test]
    fn test_load_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        assert!(store.load_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_load_recent_newest_first_and_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let entries: Vec<_> = (0..5).map(|i| entry(i, &format!("msg {}", i))).collect();
        store.upsert(&entries).unwrap();

        let loaded = store.load_recent(3).unwrap();
        let messages: Vec<_> = loaded.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["msg 4", "msg 3", "msg 2"]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let e = entry(0, "original");
        store.upsert(&[e.clone()]).unwrap();
        store.upsert(&[e.clone()]).unwrap();
        assert_eq!(store.load_recent(10).unwrap().len(), 1);

        let mut replaced = e.clone();
        replaced.message = "replaced".to_string();
        store.upsert(&[replaced]).unwrap();

        let loaded = store.load_recent(10).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, e.id);
        assert_eq!(loaded[0].message, "replaced");
    }

    #[test]
    fn test_delete_and_delete_all() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);

        let entries: Vec<_> = (0..3).map(|i| entry(i, "x")).collect();
        store.upsert(&entries).unwrap();

        store.delete(&[entries[0].id, Uuid::new_v4()]).unwrap();
        assert_eq!(store.load_recent(10).unwrap().len(), 2);

        store.delete_all().unwrap();
        assert!(store.load_recent(10).unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let e = entry(0, "durable");
        test_store(&temp_dir).upsert(&[e.clone()]).unwrap();

        let loaded = test_store(&temp_dir).load_recent(10).unwrap();
        assert_eq!(loaded, vec![e]);
    }

    #[test]
    fn test_corrupt_file_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = test_store(&temp_dir);
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(
            store.load_recent(10),
            Err(StoreError::Serialization(_))
        ));
    }
}
