//! Logging engine
//!
//! `Logger` accepts leveled, categorized events from any number of threads,
//! buffers them, persists them through a `PersistenceBackend` and rotates
//! them into archive artifacts on time and size thresholds.
//!
//! Producers only ever touch the in-memory buffer. All persistence and
//! archive I/O runs on a single worker task owned by the logger.

mod archive;
mod buffer;
mod clock;
mod entry;
mod error;
mod filter;
mod rotation;
mod worker;

pub use archive::{is_archive_file_name, list_archives, read_archive, ArchiveKind, ArchiveWriter};
pub use buffer::LogBuffer;
pub use clock::{Clock, MockClock, SystemClock};
pub use entry::{EntryId, LogCategory, LogEntry, LogLevel, SessionId, SiteInfo};
pub use error::{LoggerError, Result};
pub use filter::{admit, TimeWindow};
pub use rotation::{RotationManager, RotationState, RotationTrigger};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{LoggerConfiguration, BUFFER_FLUSH_THRESHOLD};
use crate::store::PersistenceBackend;
use worker::{Command, CommandSender, Shared, Worker};

/// Default period of the rotation check tick
pub const DEFAULT_ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Log at an explicit level, capturing the call site.
///
/// The message is only formatted when the level and time would be admitted.
#[macro_export]
macro_rules! log_at {
    ($logger:expr, $level:expr, $category:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.admits(level) {
            logger.log(level, $category, format!($($arg)+), $crate::site!());
        }
    }};
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::LogLevel::Debug, $category, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::LogLevel::Info, $category, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::LogLevel::Warning, $category, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::LogLevel::Error, $category, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $category:expr, $($arg:tt)+) => {
        $crate::log_at!($logger, $crate::logger::LogLevel::Critical, $category, $($arg)+)
    };
}

/// Builder for `Logger`
pub struct LoggerBuilder {
    config: LoggerConfiguration,
    backend: Arc<dyn PersistenceBackend>,
    archive_dir: PathBuf,
    clock: Arc<dyn Clock>,
    rotation_check_interval: Duration,
}

impl LoggerBuilder {
    /// Use a custom clock for timestamps and rotation checks
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the period of the rotation check tick
    pub fn rotation_check_interval(mut self, interval: Duration) -> Self {
        self.rotation_check_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Load persisted entries and start the worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> Logger {
        let session_id = Uuid::new_v4();
        let buffer = LogBuffer::new(BUFFER_FLUSH_THRESHOLD);

        match self.backend.load_recent(self.config.max_log_entries) {
            Ok(mut recent) => {
                recent.reverse();
                debug!(count = recent.len(), "Loaded persisted log entries");
                buffer.extend_loaded(recent);
            }
            Err(e) => {
                let e = LoggerError::PersistenceLoad(e);
                warn!("{}; starting with an empty log", e);
            }
        }

        let shared = Arc::new(Shared {
            session_id,
            config: self.config,
            clock: self.clock,
            buffer,
            backend: self.backend,
            archives: ArchiveWriter::new(self.archive_dir),
        });

        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = Worker::new(Arc::clone(&shared), self.rotation_check_interval);
        let handle = tokio::spawn(worker.run(receiver));

        info!(session_id = %session_id, "Logger started");

        Logger {
            shared,
            commands,
            worker: Mutex::new(Some(handle)),
            stopped_reported: AtomicBool::new(false),
        }
    }
}

/// The logging engine for one process run
pub struct Logger {
    shared: Arc<Shared>,
    commands: CommandSender,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped_reported: AtomicBool,
}

impl Logger {
    /// Start configuring a logger
    pub fn builder(
        config: LoggerConfiguration,
        backend: Arc<dyn PersistenceBackend>,
        archive_dir: impl Into<PathBuf>,
    ) -> LoggerBuilder {
        LoggerBuilder {
            config,
            backend,
            archive_dir: archive_dir.into(),
            clock: Arc::new(SystemClock),
            rotation_check_interval: DEFAULT_ROTATION_CHECK_INTERVAL,
        }
    }

    /// Create and start a logger with the system clock and default tick
    pub fn new(
        config: LoggerConfiguration,
        backend: Arc<dyn PersistenceBackend>,
        archive_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::builder(config, backend, archive_dir).start()
    }

    /// Session shared by every entry this logger produces
    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    pub fn configuration(&self) -> &LoggerConfiguration {
        &self.shared.config
    }

    /// Directory receiving archive artifacts
    pub fn archive_dir(&self) -> &Path {
        self.shared.archives.dir()
    }

    /// Check whether a call at `level` made now would be recorded
    pub fn admits(&self, level: LogLevel) -> bool {
        admit(level, self.shared.clock.now(), &self.shared.config)
    }

    /// Record an event.
    ///
    /// Never blocks on persistence and never fails; rejected events leave no
    /// trace. Once the worker has stopped, events are dropped.
    pub fn log(
        &self,
        level: LogLevel,
        category: impl Into<LogCategory>,
        message: impl Into<String>,
        site: SiteInfo,
    ) {
        if self.commands.is_closed() {
            self.report_stopped();
            return;
        }

        let now = self.shared.clock.now();
        if !admit(level, now, &self.shared.config) {
            return;
        }

        let entry = LogEntry::new(
            now,
            level,
            category.into(),
            message,
            self.shared.session_id,
            site,
        );

        if self.shared.buffer.append(entry) && self.commands.send(Command::ThresholdReached).is_err() {
            self.report_stopped();
        }
    }

    fn report_stopped(&self) {
        if !self.stopped_reported.swap(true, Ordering::Relaxed) {
            warn!(
                session_id = %self.shared.session_id,
                "Logger worker stopped, new log entries are dropped"
            );
        }
    }

    /// Snapshot of the readable log sequence, oldest first
    pub fn logs(&self) -> Vec<LogEntry> {
        self.shared.buffer.all_entries()
    }

    /// Snapshot filtered by minimum level and, optionally, category
    pub fn filtered(&self, minimum: LogLevel, category: Option<&LogCategory>) -> Vec<LogEntry> {
        self.logs()
            .into_iter()
            .filter(|e| e.level >= minimum)
            .filter(|e| category.map_or(true, |c| &e.category == c))
            .collect()
    }

    /// Number of entries in the readable sequence
    pub fn len(&self) -> usize {
        self.shared.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries not yet handed to persistence
    pub fn pending_len(&self) -> usize {
        self.shared.buffer.pending_len()
    }

    /// Render the readable sequence, one line per entry, no trailing newline
    pub fn export_logs(&self) -> String {
        self.logs()
            .iter()
            .map(LogEntry::export_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (ack, done) = oneshot::channel();
        self.commands
            .send(make(ack))
            .map_err(|_| LoggerError::WorkerStopped)?;
        done.await.map_err(|_| LoggerError::WorkerStopped)
    }

    /// Persist the pending batch now, then enforce the size limit
    pub async fn flush_buffer(&self) -> Result<()> {
        self.request(|ack| Command::Flush { ack }).await
    }

    /// Run a rotation check immediately, returning the archive if one was written
    pub async fn check_rotation(&self) -> Result<Option<PathBuf>> {
        self.request(|ack| Command::CheckRotation { ack }).await
    }

    /// Drop every entry from memory and from the backend
    pub async fn clear_logs(&self) -> Result<()> {
        self.request(|ack| Command::Clear { ack }).await
    }

    /// Archive the most recent entries with a synthesized critical marker.
    ///
    /// Returns the archive path, or `None` if the archive could not be written.
    pub async fn capture_crash_log(&self) -> Result<Option<PathBuf>> {
        self.request(|ack| Command::CaptureCrash { ack }).await
    }

    /// Final flush and full persist; stops periodic rotation checks.
    ///
    /// Completes only after the worker has finished. Calling it again is a
    /// no-op.
    pub async fn shutdown(&self) -> Result<()> {
        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return Ok(());
        };

        let (ack, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown { ack }).is_ok() {
            let _ = done.await;
        }
        if let Err(e) = handle.await {
            warn!("Logger worker ended abnormally: {}", e);
        }

        info!(session_id = %self.shared.session_id, "Logger shut down");
        Ok(())
    }
}
