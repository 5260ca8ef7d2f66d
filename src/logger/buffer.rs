//! Concurrent log buffer
//!
//! Holds two views of admitted entries:
//! - the readable log sequence, in append order, shared with readers
//! - the pending batch, not yet handed to persistence
//!
//! Every mutation takes the pending lock first and the sequence lock second,
//! so appends are linearized and the decision to schedule a flush is made in
//! the same critical section as the append that crossed the threshold.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::entry::{EntryId, LogEntry};

#[derive(Debug, Default)]
struct Pending {
    entries: Vec<LogEntry>,
    /// A flush was requested and the batch has not been taken yet
    flush_scheduled: bool,
}

/// Thread-safe buffer for log entries
#[derive(Debug)]
pub struct LogBuffer {
    /// Entries appended since the last flush
    pending: Mutex<Pending>,
    /// Readable log sequence, oldest first
    entries: RwLock<VecDeque<LogEntry>>,
    /// Pending size that triggers a flush
    flush_threshold: usize,
}

impl LogBuffer {
    /// Create a new buffer requesting a flush every `flush_threshold` appends
    pub fn new(flush_threshold: usize) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            entries: RwLock::new(VecDeque::new()),
            flush_threshold: flush_threshold.max(1),
        }
    }

    fn lock_pending(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, VecDeque<LogEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, VecDeque<LogEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an entry to both views.
    ///
    /// Returns `true` exactly once per batch: for the append that brings the
    /// pending batch to the threshold. The caller must then arrange for
    /// `take_pending` to run.
    pub fn append(&self, entry: LogEntry) -> bool {
        let mut pending = self.lock_pending();
        self.write_entries().push_back(entry.clone());
        pending.entries.push(entry);

        if pending.entries.len() >= self.flush_threshold && !pending.flush_scheduled {
            pending.flush_scheduled = true;
            true
        } else {
            false
        }
    }

    /// Swap the pending batch for an empty one and return it
    pub fn take_pending(&self) -> Vec<LogEntry> {
        let mut pending = self.lock_pending();
        pending.flush_scheduled = false;
        std::mem::take(&mut pending.entries)
    }

    /// Atomically empty both views, returning the readable sequence
    pub fn take_all(&self) -> Vec<LogEntry> {
        let mut pending = self.lock_pending();
        let mut entries = self.write_entries();
        pending.entries.clear();
        pending.flush_scheduled = false;
        entries.drain(..).collect()
    }

    /// Remove the oldest entries until at most `max_entries` remain.
    ///
    /// Removed entries are also dropped from the pending batch. Returns them
    /// oldest first.
    pub fn trim_to(&self, max_entries: usize) -> Vec<LogEntry> {
        let mut pending = self.lock_pending();
        let mut entries = self.write_entries();

        let overflow = entries.len().saturating_sub(max_entries);
        if overflow == 0 {
            return Vec::new();
        }

        let removed: Vec<LogEntry> = entries.drain(..overflow).collect();
        if !pending.entries.is_empty() {
            let ids: HashSet<EntryId> = removed.iter().map(|e| e.id).collect();
            pending.entries.retain(|e| !ids.contains(&e.id));
        }
        removed
    }

    /// Seed the readable sequence with previously persisted entries (oldest first)
    pub fn extend_loaded(&self, loaded: impl IntoIterator<Item = LogEntry>) {
        let _pending = self.lock_pending();
        self.write_entries().extend(loaded);
    }

    /// Add an already persisted entry to the readable sequence only
    pub fn push_persisted(&self, entry: LogEntry) {
        let _pending = self.lock_pending();
        self.write_entries().push_back(entry);
    }

    /// Get all entries as a vector
    pub fn all_entries(&self) -> Vec<LogEntry> {
        self.read_entries().iter().cloned().collect()
    }

    /// Get up to `count` of the newest entries, oldest first
    pub fn recent_entries(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.read_entries();
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Get the number of entries in the readable sequence
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    /// Check if the readable sequence is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of entries awaiting a flush
    pub fn pending_len(&self) -> usize {
        self.lock_pending().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogCategory, LogLevel, SiteInfo};
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    fn entry(message: impl Into<String>) -> LogEntry {
        LogEntry::new(
            Utc::now(),
            LogLevel::Info,
            LogCategory::general(),
            message,
            Uuid::nil(),
            SiteInfo::new("test.rs", "test", 1),
        )
    }

    #[test]
    fn test_append_and_retrieve() {
        let buffer = LogBuffer::new(50);

        assert!(!buffer.append(entry("message 1")));
        assert!(!buffer.append(entry("message 2")));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pending_len(), 2);
        let entries = buffer.all_entries();
        assert_eq!(entries[0].message, "message 1");
        assert_eq!(entries[1].message, "message 2");
    }

    #[test]
    fn test_threshold_triggers_once_per_batch() {
        let buffer = LogBuffer::new(3);

        let triggers: Vec<bool> = (0..5)
            .map(|i| buffer.append(entry(format!("msg {}", i))))
            .collect();
        // Flush already scheduled, no second trigger until the batch is taken
        assert_eq!(triggers, vec![false, false, true, false, false]);

        let batch = buffer.take_pending();
        assert_eq!(batch.len(), 5);

        let triggers: Vec<bool> = (5..8)
            .map(|i| buffer.append(entry(format!("msg {}", i))))
            .collect();
        assert_eq!(triggers, vec![false, false, true]);
        assert_eq!(buffer.len(), 8);
    }

    #[test]
    fn test_take_pending_empties_batch() {
        let buffer = LogBuffer::new(50);
        buffer.append(entry("a"));
        buffer.append(entry("b"));

        let batch = buffer.take_pending();
        assert_eq!(batch.len(), 2);
        assert_eq!(buffer.pending_len(), 0);
        assert_eq!(buffer.len(), 2);
        assert!(buffer.take_pending().is_empty());
    }

    #[test]
    fn test_trim_removes_oldest() {
        let buffer = LogBuffer::new(100);
        for i in 0..5 {
            buffer.append(entry(format!("msg {}", i)));
        }

        let removed = buffer.trim_to(3);
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].message, "msg 0");
        assert_eq!(removed[1].message, "msg 1");

        let remaining = buffer.all_entries();
        assert_eq!(remaining[0].message, "msg 2");
        // Trimmed entries never reach persistence afterwards
        assert_eq!(buffer.pending_len(), 3);
        assert!(buffer.trim_to(3).is_empty());
    }

    #[test]
    fn test_take_all_clears_both_views() {
        let buffer = LogBuffer::new(50);
        buffer.append(entry("a"));
        buffer.push_persisted(entry("b"));

        let snapshot = buffer.take_all();
        assert_eq!(snapshot.len(), 2);
        assert!(buffer.is_empty());
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_recent_entries() {
        let buffer = LogBuffer::new(50);
        for i in 0..4 {
            buffer.append(entry(format!("msg {}", i)));
        }
        let recent = buffer.recent_entries(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "msg 2");
        assert_eq!(buffer.recent_entries(10).len(), 4);
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let buffer = Arc::new(LogBuffer::new(50));
        let flushed = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                let flushed = Arc::clone(&flushed);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        if buffer.append(entry(format!("{}-{}", t, i))) {
                            let mut flushed = flushed.lock().unwrap();
                            flushed.extend(buffer.take_pending());
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut persisted = flushed.lock().unwrap().clone();
        assert!(!persisted.is_empty());
        persisted.extend(buffer.take_pending());
        assert_eq!(persisted.len(), 800);

        let ids: HashSet<_> = persisted.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 800);
        assert_eq!(buffer.len(), 800);

        // Batches are cut in append order
        let sequence: Vec<_> = buffer.all_entries().into_iter().map(|e| e.id).collect();
        let flushed_order: Vec<_> = persisted.iter().map(|e| e.id).collect();
        assert_eq!(sequence, flushed_order);
    }
}
