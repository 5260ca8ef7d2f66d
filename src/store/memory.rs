//! In-process store, for embedders without durable storage and for tests

use std::sync::RwLock;

use crate::logger::{EntryId, LogEntry};

use super::{PersistenceBackend, StoreError, StoreResult};

/// Volatile store keeping entries in insertion order
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<Vec<LogEntry>>,
    /// When set, every write fails with `StoreError::Unavailable`
    fail_writes: RwLock<bool>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored entries in insertion order
    pub fn all_entries(&self) -> Vec<LogEntry> {
        self.entries
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Make subsequent writes fail, to exercise error paths
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.write() {
            *flag = fail;
        }
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.read().map(|f| *f).unwrap_or(false) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn write_lock(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Vec<LogEntry>>> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }
}

impl PersistenceBackend for MemoryBackend {
    fn load_recent(&self, limit: usize) -> StoreResult<Vec<LogEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;

        let mut recent: Vec<_> = entries.iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        recent.truncate(limit);
        Ok(recent)
    }

    fn upsert(&self, entries: &[LogEntry]) -> StoreResult<()> {
        self.check_writable()?;
        let mut stored = self.write_lock()?;
        for entry in entries {
            match stored.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => stored.push(entry.clone()),
            }
        }
        Ok(())
    }

    fn delete(&self, ids: &[EntryId]) -> StoreResult<()> {
        self.check_writable()?;
        self.write_lock()?.retain(|e| !ids.contains(&e.id));
        Ok(())
    }

    fn delete_all(&self) -> StoreResult<()> {
        self.check_writable()?;
        self.write_lock()?.clear();
        Ok(())
    }
}
