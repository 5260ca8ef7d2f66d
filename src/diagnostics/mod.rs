//! Diagnostic channel for the logging engine itself
//!
//! Persistence and archive failures are reported through `tracing`. The host
//! routes those events to a timestamped file and prunes old diagnostic files
//! and archive artifacts.

mod file_writer;
mod retention;

pub use file_writer::{init_diagnostics, DiagnosticsFileInfo, DiagnosticsGuard};
pub use retention::{cleanup_old_archives, cleanup_old_diagnostics, DEFAULT_RETENTION_DAYS};
