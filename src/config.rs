//! Configuration management for logkeep

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::logger::{LogLevel, TimeWindow};

/// Number of pending entries that triggers an automatic flush
pub const BUFFER_FLUSH_THRESHOLD: usize = 50;

/// Number of most recent entries captured by a crash capture
pub const CRASH_CAPTURE_LIMIT: usize = 100;

/// Categories of disk errors for diagnostic messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a short description of this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full, log data could not be saved",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "failed to save log data",
        }
    }
}

/// Categorize an IO error
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28, EDQUOT = 122 on Linux / 69 on macOS
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Build a diagnostic message from an IO error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => format!("{}: {}", context, e),
        kind => format!("{}: {}", context, kind.user_message()),
    }
}

/// Engine configuration, fixed for the lifetime of one `Logger`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfiguration {
    /// Entries below this level are dropped at admission
    #[serde(default = "default_minimum_log_level")]
    pub minimum_log_level: LogLevel,

    /// Retention ceiling for the live log sequence
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,

    /// Seconds between forced rotations (default: 86400 = 1 day)
    #[serde(default = "default_log_rotation_interval_secs")]
    pub log_rotation_interval_secs: u64,

    /// Events outside this window are dropped; leaving the window forces a rotation
    #[serde(default)]
    pub active_time_range: Option<TimeWindow>,
}

fn default_minimum_log_level() -> LogLevel {
    LogLevel::Debug
}

fn default_max_log_entries() -> usize {
    1000
}

fn default_log_rotation_interval_secs() -> u64 {
    86_400
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            minimum_log_level: default_minimum_log_level(),
            max_log_entries: default_max_log_entries(),
            log_rotation_interval_secs: default_log_rotation_interval_secs(),
            active_time_range: None,
        }
    }
}

impl LoggerConfiguration {
    /// Rotation interval as a chrono duration, saturating at `chrono::Duration::MAX`
    pub fn rotation_interval(&self) -> chrono::Duration {
        i64::try_from(self.log_rotation_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON file holding persisted entries
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Directory receiving archive artifacts
    #[serde(default = "default_archive_dir")]
    pub archive_dir: PathBuf,

    /// Directory for the logger's own diagnostic output
    #[serde(default = "default_diagnostics_dir")]
    pub diagnostics_dir: PathBuf,

    /// Seconds between rotation checks (default: 60)
    #[serde(default = "default_rotation_check_secs")]
    pub rotation_check_secs: u64,

    /// Archive retention in days (default: 30)
    #[serde(default = "default_archive_retention_days")]
    pub archive_retention_days: u64,

    #[serde(default)]
    pub logger: LoggerConfiguration,
}

fn default_store_path() -> PathBuf {
    config_dir().join("logs.json")
}

fn default_archive_dir() -> PathBuf {
    config_dir().join("archives")
}

fn default_diagnostics_dir() -> PathBuf {
    config_dir().join("diagnostics")
}

fn default_rotation_check_secs() -> u64 {
    60
}

fn default_archive_retention_days() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            archive_dir: default_archive_dir(),
            diagnostics_dir: default_diagnostics_dir(),
            rotation_check_secs: default_rotation_check_secs(),
            archive_retention_days: default_archive_retention_days(),
            logger: LoggerConfiguration::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Period of the rotation check tick
    pub fn rotation_check_interval(&self) -> Duration {
        Duration::from_secs(self.rotation_check_secs.max(1))
    }

    /// Ensure all directories this configuration writes into exist
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;

        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create store directory")?;
        }

        std::fs::create_dir_all(&self.archive_dir)
            .context("Failed to create archive directory")?;

        std::fs::create_dir_all(&self.diagnostics_dir)
            .context("Failed to create diagnostics directory")?;

        Ok(())
    }
}

/// Get the base configuration directory (~/.logkeep)
/// Falls back to ./.logkeep if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| PathBuf::from(".logkeep"))
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".logkeep"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logger_configuration() {
        let config = LoggerConfiguration::default();
        assert_eq!(config.minimum_log_level, LogLevel::Debug);
        assert_eq!(config.max_log_entries, 1000);
        assert_eq!(config.log_rotation_interval_secs, 86_400);
        assert!(config.active_time_range.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.rotation_check_secs, parsed.rotation_check_secs);
        assert_eq!(config.logger, parsed.logger);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml(
            r#"
            rotation_check_secs = 5

            [logger]
            minimum_log_level = "warning"
            max_log_entries = 200

            [logger.active_time_range]
            kind = "daily"
            start = "09:00:00"
            end = "17:30:00"
            "#,
        )
        .unwrap();

        assert_eq!(config.rotation_check_secs, 5);
        assert_eq!(config.archive_retention_days, 30);
        assert_eq!(config.logger.minimum_log_level, LogLevel::Warning);
        assert_eq!(config.logger.max_log_entries, 200);
        assert_eq!(config.logger.log_rotation_interval_secs, 86_400);
        assert!(matches!(
            config.logger.active_time_range,
            Some(TimeWindow::Daily { .. })
        ));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let result = Config::from_toml("[logger]\nminimum_log_level = \"verbose\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_huge_rotation_interval_saturates() {
        let config = Config::from_toml("[logger]\nlog_rotation_interval_secs = 9223372036854775807\n")
            .unwrap();
        assert_eq!(config.logger.rotation_interval(), chrono::Duration::MAX);

        let config = LoggerConfiguration {
            log_rotation_interval_secs: u64::MAX,
            ..Default::default()
        };
        assert_eq!(config.rotation_interval(), chrono::Duration::MAX);

        let config = LoggerConfiguration {
            log_rotation_interval_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.rotation_interval(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_rotation_check_interval_never_zero() {
        let config = Config {
            rotation_check_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.rotation_check_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".logkeep"));
    }

    #[test]
    fn test_friendly_io_error_message() {
        let e = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(
            friendly_io_error_message(&e, "Failed to write log store"),
            "Failed to write log store: permission denied"
        );
    }
}
