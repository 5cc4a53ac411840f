//! Interval arithmetic for bar bucketing.

use serde::{Deserialize, Serialize};

/// Floors `timestamp` to the start of its containing `interval`-sized bucket.
///
/// Both arguments must be expressed in the same unit (seconds, nanoseconds).
/// The result is always `<= timestamp` and aligned to a multiple of
/// `interval`.
#[must_use]
pub const fn floor_to_interval(timestamp: i64, interval: i64) -> i64 {
    timestamp - timestamp % interval
}

/// Converts a second-based timestamp to nanoseconds, the unit of the remote
/// pagination cursor.
#[must_use]
pub const fn to_nano_sec(t: i64) -> i64 {
    t * 1_000_000_000
}

/// Fixed bar width, configured in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interval(u32);

impl Interval {
    /// Creates an interval of the given number of minutes.
    #[must_use]
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Returns the interval width in minutes.
    #[must_use]
    pub const fn minutes(&self) -> u32 {
        self.0
    }

    /// Returns the interval width in seconds, the unit used for bucketing.
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        self.0 as i64 * 60
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_to_interval() {
        assert_eq!(floor_to_interval(0, 60), 0);
        assert_eq!(floor_to_interval(59, 60), 0);
        assert_eq!(floor_to_interval(60, 60), 60);
        // 1_500_000_000 is already 60-aligned.
        assert_eq!(floor_to_interval(1_500_000_001, 60), 1_500_000_000);
        assert_eq!(floor_to_interval(1_500_000_059, 60), 1_500_000_000);
    }

    #[test]
    fn test_floor_to_interval_is_idempotent() {
        for ts in [0, 1, 61, 3599, 1_500_000_001] {
            let floored = floor_to_interval(ts, 60);
            assert_eq!(floor_to_interval(floored, 60), floored);
        }
    }

    #[test]
    fn test_floor_is_aligned_and_below() {
        for ts in [17, 1234, 86_401] {
            let floored = floor_to_interval(ts, 300);
            assert!(floored <= ts);
            assert_eq!(floored % 300, 0);
        }
    }

    #[test]
    fn test_to_nano_sec() {
        assert_eq!(to_nano_sec(1_500_000_002), 1_500_000_002_000_000_000);
        assert_eq!(to_nano_sec(0), 0);
    }

    #[test]
    fn test_interval_units() {
        let interval = Interval::from_minutes(15);
        assert_eq!(interval.minutes(), 15);
        assert_eq!(interval.seconds(), 900);
        assert_eq!(interval.to_string(), "15");
    }
}
