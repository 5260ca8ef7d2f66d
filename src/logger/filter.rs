//! Admission filter
//!
//! Decides whether a log call is recorded at all, before any entry is built.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::LogLevel;
use crate::config::LoggerConfiguration;

/// Window of time during which events are recorded
///
/// Both variants are closed ranges. A `Daily` window whose end is earlier than
/// its start wraps past midnight (e.g. 22:00:00 to 06:00:00).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TimeWindow {
    /// Fixed interval between two instants
    Absolute {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Repeating interval between two UTC times of day
    Daily { start: NaiveTime, end: NaiveTime },
}

impl TimeWindow {
    /// Check whether `timestamp` falls inside this window
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        match self {
            TimeWindow::Absolute { start, end } => *start <= timestamp && timestamp <= *end,
            TimeWindow::Daily { start, end } => {
                let time = timestamp.time();
                if start <= end {
                    *start <= time && time <= *end
                } else {
                    time >= *start || time <= *end
                }
            }
        }
    }
}

/// Pure admission predicate
pub fn admit(level: LogLevel, timestamp: DateTime<Utc>, config: &LoggerConfiguration) -> bool {
    if level < config.minimum_log_level {
        return false;
    }
    match &config.active_time_range {
        Some(window) => window.contains(timestamp),
        None => true,
    }
}
