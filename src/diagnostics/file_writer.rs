//! File-based diagnostics with tracing integration
//!
//! Sets up a tracing subscriber writing to a timestamped file, and mirrors
//! warnings and errors to stderr so failures of the durable path are visible
//! even when the file cannot be read.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Prefix of diagnostic file names
pub(crate) const DIAGNOSTICS_FILE_PREFIX: &str = "logkeep-";

/// Information about the current diagnostics file
#[derive(Debug, Clone)]
pub struct DiagnosticsFileInfo {
    /// Full path to the diagnostics file
    pub path: PathBuf,
}

/// Generate a timestamped diagnostics file path
pub fn create_diagnostics_file_path(dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    dir.join(format!("{}{}.log", DIAGNOSTICS_FILE_PREFIX, timestamp))
}

/// A writer appending to the shared diagnostics file
struct FileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.write_all(buf);
            let _ = file.flush();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Ok(mut file) = self.file.lock() {
            file.flush()
        } else {
            Ok(())
        }
    }
}

/// Writer factory for tracing-subscriber
struct FileWriterMaker {
    file: Arc<Mutex<File>>,
}

impl<'a> MakeWriter<'a> for FileWriterMaker {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Guard that keeps the diagnostics file open
pub struct DiagnosticsGuard {
    _file: Arc<Mutex<File>>,
}

/// Initialize the diagnostic channel
///
/// Returns the file info and a guard that must be kept alive for the duration
/// of the process.
pub fn init_diagnostics(dir: &Path) -> Result<(DiagnosticsFileInfo, DiagnosticsGuard)> {
    fs::create_dir_all(dir).context("Failed to create diagnostics directory")?;

    let path = create_diagnostics_file_path(dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .context("Failed to open diagnostics file")?;
    let file = Arc::new(Mutex::new(file));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(FileWriterMaker {
            file: Arc::clone(&file),
        })
        .with_ansi(false)
        .with_target(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "logkeep=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install diagnostics subscriber")?;

    Ok((DiagnosticsFileInfo { path }, DiagnosticsGuard { _file: file }))
}
