//! Log event model
//!
//! Severity levels, categories and the immutable `LogEntry` value produced by
//! every admitted log call.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a log entry
pub type EntryId = Uuid;

/// Identifier shared by every entry produced by one `Logger` instance
pub type SessionId = Uuid;

/// Severity of a log entry
///
/// Ordering follows declaration rank: `Debug < Info < Warning < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// All levels in ascending severity order
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    /// Get the display name for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// Check if this level is a warning or worse
    pub fn is_alert(&self) -> bool {
        *self >= LogLevel::Warning
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// A named classification for log entries
///
/// Equality and hashing are by name, case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogCategory(String);

impl LogCategory {
    pub const GENERAL: &'static str = "general";
    pub const NETWORK: &'static str = "network";
    pub const DATABASE: &'static str = "database";
    pub const UI: &'static str = "ui";
    pub const SECURITY: &'static str = "security";
    pub const PERFORMANCE: &'static str = "performance";
    pub const SYSTEM: &'static str = "system";
    pub const CRASH: &'static str = "crash";

    /// Create a custom category
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn general() -> Self {
        Self::new(Self::GENERAL)
    }

    pub fn network() -> Self {
        Self::new(Self::NETWORK)
    }

    pub fn database() -> Self {
        Self::new(Self::DATABASE)
    }

    pub fn ui() -> Self {
        Self::new(Self::UI)
    }

    pub fn security() -> Self {
        Self::new(Self::SECURITY)
    }

    pub fn performance() -> Self {
        Self::new(Self::PERFORMANCE)
    }

    pub fn system() -> Self {
        Self::new(Self::SYSTEM)
    }

    pub fn crash() -> Self {
        Self::new(Self::CRASH)
    }

    /// Get the category name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogCategory {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Call-site provenance captured where the log call was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteInfo {
    pub file_name: String,
    pub function_name: String,
    pub line_number: u32,
}

impl SiteInfo {
    pub fn new(
        file_name: impl Into<String>,
        function_name: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            function_name: function_name.into(),
            line_number,
        }
    }
}

/// Capture the `SiteInfo` of the invocation point.
///
/// The function name is the path of the enclosing function, without the
/// crate-local helper used to derive it.
#[macro_export]
macro_rules! site {
    () => {{
        fn __logkeep_site() {}
        fn __type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = __type_name_of(__logkeep_site);
        let name = name.strip_suffix("::__logkeep_site").unwrap_or(name);
        let name = name.trim_end_matches("::{{closure}}");
        $crate::logger::SiteInfo::new(file!(), name, line!())
    }};
}

/// A single, immutable log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier, never reused
    pub id: EntryId,
    /// When the log call was made
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: LogCategory,
    pub message: String,
    /// Session of the logger that produced this entry
    pub session_id: SessionId,
    pub file_name: String,
    pub function_name: String,
    pub line_number: u32,
}

impl LogEntry {
    /// Create a new entry with a fresh id
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        category: LogCategory,
        message: impl Into<String>,
        session_id: SessionId,
        site: SiteInfo,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            level,
            category,
            message: message.into(),
            session_id,
            file_name: site.file_name,
            function_name: site.function_name,
            line_number: site.line_number,
        }
    }

    /// Render as a single export line:
    /// `[timestamp] [level] [category] message - file:function:line`
    pub fn export_line(&self) -> String {
        format!(
            "[{}] [{}] [{}] {} - {}:{}:{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.category,
            self.message,
            self.file_name,
            self.function_name,
            self.line_number
        )
    }
}
