// ⏰ Rolling windows - time is an explicit argument
//
// "Recent" and "previous" are always relative to a reference time passed in
// by the caller. Nothing in here reads the clock.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Which trailing window an instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowPosition {
    /// After `reference - length` (no upper bound)
    Recent,
    /// In `(reference - 2*length, reference - length]`
    Previous,
    /// At or before `reference - 2*length`
    Older,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingWindow {
    length: Duration,
}

impl RollingWindow {
    pub fn new() -> Self {
        Self::days(DEFAULT_WINDOW_DAYS)
    }

    pub fn days(days: i64) -> Self {
        RollingWindow {
            length: Duration::days(days),
        }
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// Lower (exclusive) bound of the recent window
    pub fn recent_cutoff(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        reference - self.length
    }

    /// Lower (exclusive) bound of the previous window
    pub fn previous_cutoff(&self, reference: DateTime<Utc>) -> DateTime<Utc> {
        reference - self.length - self.length
    }

    pub fn is_recent(&self, instant: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
        instant > self.recent_cutoff(reference)
    }

    pub fn is_previous(&self, instant: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
        instant > self.previous_cutoff(reference) && instant <= self.recent_cutoff(reference)
    }

    pub fn position(&self, instant: DateTime<Utc>, reference: DateTime<Utc>) -> WindowPosition {
        if self.is_recent(instant, reference) {
            WindowPosition::Recent
        } else if self.is_previous(instant, reference) {
            WindowPosition::Previous
        } else {
            WindowPosition::Older
        }
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// `numerator / denominator`, or 0 when there is nothing to divide by.
pub fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_boundaries() {
        let window = RollingWindow::new();
        let now = reference();

        assert_eq!(window.position(now, now), WindowPosition::Recent);
        assert_eq!(
            window.position(now + Duration::days(10), now),
            WindowPosition::Recent
        );

        // Exactly 30 days back belongs to the previous window
        let thirty = now - Duration::days(30);
        assert_eq!(window.position(thirty, now), WindowPosition::Previous);
        assert_eq!(
            window.position(thirty + Duration::seconds(1), now),
            WindowPosition::Recent
        );

        // Exactly 60 days back is outside both
        let sixty = now - Duration::days(60);
        assert_eq!(window.position(sixty, now), WindowPosition::Older);
        assert_eq!(
            window.position(sixty + Duration::seconds(1), now),
            WindowPosition::Previous
        );
    }

    #[test]
    fn test_custom_length() {
        let window = RollingWindow::days(7);
        let now = reference();

        assert_eq!(window.length(), Duration::days(7));
        assert!(window.is_recent(now - Duration::days(6), now));
        assert!(window.is_previous(now - Duration::days(8), now));
        assert!(!window.is_previous(now - Duration::days(15), now));
    }

    #[test]
    fn test_rate_empty_safe() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(3, 0), 0.0);
        assert_eq!(rate(1, 4), 0.25);
    }
}
