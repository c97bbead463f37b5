use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Progress reported when the staking term has no usable length (`end <= start`).
pub const DEFAULT_TERM_PROGRESS: f64 = 47.09;

/// Term length in days reported when the staking term has no usable length
pub const DEFAULT_TERM_DAYS: i64 = 100;

const SECS_PER_DAY: i64 = 86_400;

/// Length of the staking term in seconds.
pub fn term_duration_secs(start_time: i64, end_time: i64) -> i64 {
    end_time.saturating_sub(start_time)
}

/// Percent of the staking term elapsed at `now`, clamped to `[0, 100]`.
pub fn term_progress(start_time: i64, end_time: i64, now: DateTime<Utc>) -> f64 {
    let duration = term_duration_secs(start_time, end_time);
    if duration <= 0 {
        return DEFAULT_TERM_PROGRESS;
    }
    let elapsed = now.timestamp().saturating_sub(start_time);
    let progress = elapsed as f64 / duration as f64 * 100.0;
    progress.clamp(0.0, 100.0)
}

/// Whole days in the staking term.
pub fn term_duration_days(start_time: i64, end_time: i64) -> i64 {
    let duration = term_duration_secs(start_time, end_time);
    if duration <= 0 {
        return DEFAULT_TERM_DAYS;
    }
    duration / SECS_PER_DAY
}

/// Round to two decimals for display
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Source of wall-clock time. Injected wherever a timestamp is stamped so tests
/// can pin it.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually-advanced clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_progress_midway() {
        let progress = term_progress(1_000, 3_000, at(2_000));
        assert_eq!(progress, 50.0);
    }

    #[test]
    fn test_progress_clamped() {
        assert_eq!(term_progress(1_000, 3_000, at(500)), 0.0);
        assert_eq!(term_progress(1_000, 3_000, at(10_000)), 100.0);
    }

    #[test]
    fn test_degenerate_term_uses_defaults() {
        assert_eq!(term_progress(0, 0, at(10)), DEFAULT_TERM_PROGRESS);
        assert_eq!(term_progress(5_000, 1_000, at(10)), DEFAULT_TERM_PROGRESS);
        assert_eq!(term_duration_days(0, 0), DEFAULT_TERM_DAYS);
    }

    #[test]
    fn test_duration_days_floors() {
        assert_eq!(term_duration_days(0, 86_400 * 14 + 86_399), 14);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(at(100));
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now(), at(130));
    }
}
