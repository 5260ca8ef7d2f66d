//! Persistence worker
//!
//! The single consumer behind a `Logger`. It is the only code that cuts
//! pending batches, writes to the persistence backend or writes archives, so
//! flushes, trims, rotations and clears are serialized in command order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::archive::{ArchiveKind, ArchiveWriter};
use super::buffer::LogBuffer;
use super::clock::Clock;
use super::entry::{LogCategory, LogEntry, LogLevel, SessionId};
use super::error::LoggerError;
use super::rotation::{RotationManager, RotationTrigger};
use crate::config::{LoggerConfiguration, CRASH_CAPTURE_LIMIT};
use crate::store::PersistenceBackend;

/// State shared between the facade and the worker
pub(crate) struct Shared {
    pub session_id: SessionId,
    pub config: LoggerConfiguration,
    pub clock: Arc<dyn Clock>,
    pub buffer: LogBuffer,
    pub backend: Arc<dyn PersistenceBackend>,
    pub archives: ArchiveWriter,
}

/// Requests handled by the worker, in arrival order
pub(crate) enum Command {
    /// The pending batch reached the flush threshold
    ThresholdReached,
    /// Explicit flush
    Flush { ack: oneshot::Sender<()> },
    /// Rotation check outside the periodic tick
    CheckRotation {
        ack: oneshot::Sender<Option<PathBuf>>,
    },
    Clear { ack: oneshot::Sender<()> },
    CaptureCrash {
        ack: oneshot::Sender<Option<PathBuf>>,
    },
    /// Final flush and full persist, then stop
    Shutdown { ack: oneshot::Sender<()> },
}

pub(crate) type CommandSender = mpsc::UnboundedSender<Command>;

pub(crate) struct Worker {
    shared: Arc<Shared>,
    rotation: RotationManager,
    tick_period: Duration,
}

impl Worker {
    pub fn new(shared: Arc<Shared>, tick_period: Duration) -> Self {
        let rotation = RotationManager::new(shared.clock.now(), &shared.config);
        Self {
            shared,
            rotation,
            tick_period,
        }
    }

    /// Process commands and periodic ticks until shutdown
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut ticker = time::interval_at(Instant::now() + self.tick_period, self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        // Every sender dropped without a shutdown
                        self.flush();
                        break;
                    };
                    if self.handle(command) {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.check_rotation();
                }
            }
        }

        debug!(session_id = %self.shared.session_id, "Logger worker stopped");
    }

    /// Handle one command, returning true when the worker must stop
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::ThresholdReached => {
                self.flush();
            }
            Command::Flush { ack } => {
                self.flush();
                let _ = ack.send(());
            }
            Command::CheckRotation { ack } => {
                let archive = self.check_rotation();
                let _ = ack.send(archive);
            }
            Command::Clear { ack } => {
                self.clear();
                let _ = ack.send(());
            }
            Command::CaptureCrash { ack } => {
                let archive = self.capture_crash();
                let _ = ack.send(archive);
            }
            Command::Shutdown { ack } => {
                self.flush();
                self.persist_all();
                let _ = ack.send(());
                return true;
            }
        }
        false
    }

    fn now(&self) -> DateTime<Utc> {
        self.shared.clock.now()
    }

    /// Hand the pending batch to the backend, then enforce the size limit
    fn flush(&mut self) {
        let batch = self.shared.buffer.take_pending();
        if !batch.is_empty() {
            match self.shared.backend.upsert(&batch) {
                Ok(()) => debug!(count = batch.len(), "Flushed log batch"),
                Err(e) => {
                    let e = LoggerError::PersistenceWrite(e);
                    error!(count = batch.len(), "{}", e);
                }
            }
        }

        self.trim_overflow();
    }

    /// Archive and evict the oldest entries above `max_log_entries`
    fn trim_overflow(&mut self) {
        let removed = self.shared.buffer.trim_to(self.shared.config.max_log_entries);
        if removed.is_empty() {
            return;
        }

        match self
            .shared
            .archives
            .write(ArchiveKind::Overflow, self.now(), &removed)
        {
            Ok(path) => info!(
                count = removed.len(),
                archive = %path.display(),
                "Archived overflow log entries"
            ),
            Err(e) => error!(
                count = removed.len(),
                "{}; evicted entries were not archived",
                e
            ),
        }

        let ids: Vec<_> = removed.iter().map(|e| e.id).collect();
        if let Err(e) = self.shared.backend.delete(&ids) {
            error!("{}", LoggerError::PersistenceWrite(e));
        }
    }

    /// Rotate if the interval elapsed or the active window was just left
    fn check_rotation(&mut self) -> Option<PathBuf> {
        let now = self.now();
        let trigger = self.rotation.check(now, &self.shared.config)?;
        let archive = self.rotate(now, trigger);
        self.rotation.finish(now);
        archive
    }

    fn rotate(&mut self, now: DateTime<Utc>, trigger: RotationTrigger) -> Option<PathBuf> {
        let snapshot = self.shared.buffer.take_all();
        if snapshot.is_empty() {
            debug!(?trigger, "Nothing to rotate");
            return None;
        }

        if let Err(e) = self.shared.backend.delete_all() {
            error!("{}", LoggerError::PersistenceWrite(e));
        }

        match self
            .shared
            .archives
            .write(ArchiveKind::Rotation, now, &snapshot)
        {
            Ok(path) => {
                info!(
                    ?trigger,
                    count = snapshot.len(),
                    archive = %path.display(),
                    "Rotated logs"
                );
                Some(path)
            }
            Err(e) => {
                error!(
                    ?trigger,
                    lost = snapshot.len(),
                    "{}; rotated entries were discarded",
                    e
                );
                None
            }
        }
    }

    fn clear(&mut self) {
        let discarded = self.shared.buffer.take_all();
        if let Err(e) = self.shared.backend.delete_all() {
            error!("{}", LoggerError::PersistenceWrite(e));
        }
        info!(count = discarded.len(), "Cleared logs");
    }

    /// Archive the most recent entries plus a synthesized critical entry
    fn capture_crash(&mut self) -> Option<PathBuf> {
        let now = self.now();
        let mut captured = self.shared.buffer.recent_entries(CRASH_CAPTURE_LIMIT);

        let marker = LogEntry::new(
            now,
            LogLevel::Critical,
            LogCategory::crash(),
            format!("Crash log captured with {} recent entries", captured.len()),
            self.shared.session_id,
            crate::site!(),
        );

        if let Err(e) = self.shared.backend.upsert(std::slice::from_ref(&marker)) {
            error!("{}", LoggerError::PersistenceWrite(e));
        }
        self.shared.buffer.push_persisted(marker.clone());
        captured.push(marker);

        match self
            .shared
            .archives
            .write(ArchiveKind::Crash, now, &captured)
        {
            Ok(path) => {
                warn!(
                    count = captured.len(),
                    archive = %path.display(),
                    "Captured crash log"
                );
                Some(path)
            }
            Err(e) => {
                error!("{}", e);
                None
            }
        }
    }

    /// Persist the whole readable sequence
    fn persist_all(&self) {
        let entries = self.shared.buffer.all_entries();
        if entries.is_empty() {
            return;
        }
        match self.shared.backend.upsert(&entries) {
            Ok(()) => debug!(count = entries.len(), "Persisted log sequence"),
            Err(e) => error!("{}", LoggerError::PersistenceWrite(e)),
        }
    }
}
