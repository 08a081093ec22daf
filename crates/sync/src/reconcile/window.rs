//! The poll sync window.
//!
//! Each poll cycle queries the POS for changes inside
//! `[now - lookback, now]`. The window is stateless - nothing about the
//! previous cycle is persisted - so its width is what bounds missed work:
//! as long as `lookback` exceeds the poll interval plus the worst
//! scheduler drift (and one skipped cycle, if that must be survived),
//! consecutive windows overlap and no change event falls between them.
//! The overlap re-delivers events instead; the reconcilers are idempotent
//! against that by design.

use chrono::{DateTime, Duration, Utc};

/// The time range one poll cycle queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

impl SyncWindow {
    /// Compute the window for a cycle starting at `now`.
    #[must_use]
    pub fn lookback(now: DateTime<Utc>, lookback: Duration) -> Self {
        Self {
            since: now - lookback,
            until: now,
        }
    }

    /// Whether an event timestamp falls inside this window.
    #[must_use]
    pub fn covers(&self, at: DateTime<Utc>) -> bool {
        self.since <= at && at <= self.until
    }

    /// The window width.
    #[must_use]
    pub fn width(&self) -> Duration {
        self.until - self.since
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_lookback_window_bounds() {
        let now = at("2026-08-06T12:00:00Z");
        let window = SyncWindow::lookback(now, Duration::hours(2));

        assert_eq!(window.since, at("2026-08-06T10:00:00Z"));
        assert_eq!(window.until, now);
        assert_eq!(window.width(), Duration::hours(2));
    }

    #[test]
    fn test_covers_is_inclusive() {
        let window = SyncWindow::lookback(at("2026-08-06T12:00:00Z"), Duration::hours(2));

        assert!(window.covers(at("2026-08-06T10:00:00Z")));
        assert!(window.covers(at("2026-08-06T11:30:00Z")));
        assert!(window.covers(at("2026-08-06T12:00:00Z")));
        assert!(!window.covers(at("2026-08-06T09:59:59Z")));
        assert!(!window.covers(at("2026-08-06T12:00:01Z")));
    }

    /// With a 2h lookback and a 15min poll interval, every instant stays
    /// covered across consecutive cycles even when one cycle is skipped
    /// and the next fires late.
    #[test]
    fn test_consecutive_windows_leave_no_gap() {
        let lookback = Duration::hours(2);
        let interval = Duration::minutes(15);
        let drift = Duration::minutes(3);

        let first_run = at("2026-08-06T08:00:00Z");
        // One cycle skipped; the next fires an interval late, plus drift.
        let second_run = first_run + interval + interval + drift;

        let first = SyncWindow::lookback(first_run, lookback);
        let second = SyncWindow::lookback(second_run, lookback);

        // The second window reaches back past the end of the first.
        assert!(second.since < first.until);

        // An event just after the first cycle ran is still in-window.
        let event = first_run + Duration::seconds(1);
        assert!(second.covers(event));
    }

    /// The converse: a lookback below the effective cycle gap loses
    /// events, which is why the default exceeds the interval many times
    /// over.
    #[test]
    fn test_short_lookback_would_gap() {
        let lookback = Duration::minutes(10);
        let first_run = at("2026-08-06T08:00:00Z");
        let second_run = first_run + Duration::minutes(30);

        let first = SyncWindow::lookback(first_run, lookback);
        let second = SyncWindow::lookback(second_run, lookback);

        assert!(second.since > first.until);
    }
}
