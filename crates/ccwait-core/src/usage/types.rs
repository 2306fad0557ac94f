//! Usage window types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Utilization at which a window counts as limited
const LIMIT_UTILIZATION: f64 = 100.0;

/// Quota consumption for one tracking window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageWindow {
    /// Percentage used (0-100)
    pub utilization: f64,
    /// When the window resets
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsageWindow {
    pub fn new(utilization: f64, resets_at: Option<DateTime<Utc>>) -> Self {
        Self {
            utilization,
            resets_at,
        }
    }

    /// True at or above 100% utilization
    pub fn is_limited(&self) -> bool {
        self.utilization >= LIMIT_UTILIZATION
    }

    /// Seconds until reset, clamped at zero; `None` without a reset time
    pub fn resets_in_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.resets_at
            .map(|at| at.signed_duration_since(now).num_seconds().max(0))
    }
}

/// Current status across all windows reported by the usage source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageStatus {
    /// Short (5 hour) window
    pub five_hour: UsageWindow,
    /// Long (7 day) window
    pub seven_day: UsageWindow,
    /// Optional sub-tier window
    pub seven_day_opus: Option<UsageWindow>,
}

impl UsageStatus {
    /// Labelled windows in display order
    pub fn windows(&self) -> Vec<(&'static str, &UsageWindow)> {
        let mut windows = vec![("5-hour", &self.five_hour), ("7-day", &self.seven_day)];
        if let Some(opus) = &self.seven_day_opus {
            windows.push(("7-day Opus", opus));
        }
        windows
    }

    /// True if any window is at its limit
    pub fn is_limited(&self) -> bool {
        self.windows().iter().any(|(_, w)| w.is_limited())
    }

    /// Earliest reset among limited windows
    pub fn next_reset(&self) -> Option<DateTime<Utc>> {
        self.windows()
            .iter()
            .filter(|(_, w)| w.is_limited())
            .filter_map(|(_, w)| w.resets_at)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 17, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_window_is_limited_threshold() {
        assert!(!UsageWindow::new(99.9, None).is_limited());
        assert!(UsageWindow::new(100.0, None).is_limited());
        assert!(UsageWindow::new(120.0, None).is_limited());
    }

    #[test]
    fn test_resets_in_seconds_never_negative() {
        let window = UsageWindow::new(50.0, Some(at(10)));
        assert_eq!(window.resets_in_seconds(at(9)), Some(3600));
        assert_eq!(window.resets_in_seconds(at(11)), Some(0));
        assert_eq!(UsageWindow::new(50.0, None).resets_in_seconds(at(9)), None);
    }

    #[test]
    fn test_status_is_limited_any_window() {
        let mut status = UsageStatus::default();
        assert!(!status.is_limited());

        status.seven_day = UsageWindow::new(100.0, None);
        assert!(status.is_limited());

        let opus_only = UsageStatus {
            seven_day_opus: Some(UsageWindow::new(100.0, None)),
            ..UsageStatus::default()
        };
        assert!(opus_only.is_limited());
    }

    #[test]
    fn test_next_reset_earliest_limited() {
        let status = UsageStatus {
            five_hour: UsageWindow::new(100.0, Some(at(15))),
            seven_day: UsageWindow::new(100.0, Some(at(12))),
            seven_day_opus: Some(UsageWindow::new(40.0, Some(at(10)))),
        };
        assert_eq!(status.next_reset(), Some(at(12)));

        let unlimited = UsageStatus {
            five_hour: UsageWindow::new(10.0, Some(at(15))),
            ..UsageStatus::default()
        };
        assert_eq!(unlimited.next_reset(), None);
    }

    #[test]
    fn test_windows_labels() {
        let status = UsageStatus::default();
        let labels: Vec<_> = status.windows().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["5-hour", "7-day"]);
    }
}
