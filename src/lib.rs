//! logkeep - in-process structured logging core
//!
//! Admits leveled, categorized events from concurrent producers, buffers them,
//! persists them through a pluggable backend and rotates them into archives.

pub mod config;
pub mod diagnostics;
pub mod logger;
pub mod store;

pub use logger::{LogCategory, LogEntry, LogLevel, Logger, LoggerError, SiteInfo};
