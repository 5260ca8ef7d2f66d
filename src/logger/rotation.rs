//! Rotation policy
//!
//! Tracks when the live log set was last rotated and decides, on each tick,
//! whether a time-triggered rotation is due.

use chrono::{DateTime, Utc};

use crate::config::LoggerConfiguration;

/// Rotation state of one logger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Active,
    Rotating,
}

/// Why a rotation fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationTrigger {
    /// `log_rotation_interval_secs` elapsed since the last rotation
    IntervalElapsed,
    /// The clock just left the configured active time range
    LeftActiveWindow,
}

/// Bookkeeping for time-triggered rotation
#[derive(Debug)]
pub struct RotationManager {
    state: RotationState,
    last_rotation: DateTime<Utc>,
    /// Whether the previous check saw the clock inside the active window
    was_in_window: bool,
}

impl RotationManager {
    pub fn new(now: DateTime<Utc>, config: &LoggerConfiguration) -> Self {
        Self {
            state: RotationState::Active,
            last_rotation: now,
            was_in_window: config
                .active_time_range
                .as_ref()
                .map_or(true, |w| w.contains(now)),
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    pub fn last_rotation(&self) -> DateTime<Utc> {
        self.last_rotation
    }

    /// Decide whether a rotation is due at `now`.
    ///
    /// On `Some`, the manager enters `Rotating`; call `finish` once the
    /// rotation completed or failed.
    pub fn check(
        &mut self,
        now: DateTime<Utc>,
        config: &LoggerConfiguration,
    ) -> Option<RotationTrigger> {
        if self.state == RotationState::Rotating {
            return None;
        }

        let in_window = config
            .active_time_range
            .as_ref()
            .map_or(true, |w| w.contains(now));
        let left_window = self.was_in_window && !in_window;
        self.was_in_window = in_window;

        let trigger = if now - self.last_rotation >= config.rotation_interval() {
            Some(RotationTrigger::IntervalElapsed)
        } else if left_window {
            Some(RotationTrigger::LeftActiveWindow)
        } else {
            None
        };

        if trigger.is_some() {
            self.state = RotationState::Rotating;
        }
        trigger
    }

    /// Return to `Active`, recording `now` as the rotation instant
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.state = RotationState::Active;
        self.last_rotation = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::TimeWindow;
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()
    }

    fn config(interval_secs: u64) -> LoggerConfiguration {
        LoggerConfiguration {
            log_rotation_interval_secs: interval_secs,
            ..Default::default()
        }
    }

    #[test]
    fn test_interval_rotation() {
        let config = config(30);
        let mut manager = RotationManager::new(start(), &config);

        assert_eq!(manager.check(start() + Duration::seconds(29), &config), None);
        assert_eq!(
            manager.check(start() + Duration::seconds(30), &config),
            Some(RotationTrigger::IntervalElapsed)
        );
        assert_eq!(manager.state(), RotationState::Rotating);

        // No double trigger while rotating
        assert_eq!(manager.check(start() + Duration::seconds(31), &config), None);

        manager.finish(start() + Duration::seconds(31));
        assert_eq!(manager.state(), RotationState::Active);
        assert_eq!(manager.check(start() + Duration::seconds(60), &config), None);
        assert!(manager.check(start() + Duration::seconds(61), &config).is_some());
    }

    #[test]
    fn test_leaving_window_triggers_once() {
        let config = LoggerConfiguration {
            active_time_range: Some(TimeWindow::Absolute {
                start: start(),
                end: start() + Duration::minutes(5),
            }),
            ..config(86_400)
        };
        let mut manager = RotationManager::new(start(), &config);

        assert_eq!(manager.check(start() + Duration::minutes(4), &config), None);
        assert_eq!(
            manager.check(start() + Duration::minutes(6), &config),
            Some(RotationTrigger::LeftActiveWindow)
        );
        manager.finish(start() + Duration::minutes(6));

        // Still outside: not a fresh crossing
        assert_eq!(manager.check(start() + Duration::minutes(7), &config), None);
    }

    #[test]
    fn test_starting_outside_window_does_not_trigger() {
        let config = LoggerConfiguration {
            active_time_range: Some(TimeWindow::Absolute {
                start: start() + Duration::hours(1),
                end: start() + Duration::hours(2),
            }),
            ..config(86_400)
        };
        let mut manager = RotationManager::new(start(), &config);
        assert_eq!(manager.check(start() + Duration::minutes(1), &config), None);
    }
}
