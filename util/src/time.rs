//! General time utility functions

use chrono;
use std::time::Duration;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Get the period of a loop running at the given frequency.
///
/// Non-positive frequencies give a zero period.
pub fn period_from_hz(freq_hz: f64) -> Duration {
    if freq_hz > 0.0 {
        Duration::from_secs_f64(1.0 / freq_hz)
    } else {
        Duration::from_secs(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_period_from_hz() {
        assert_eq!(period_from_hz(20.0), Duration::from_millis(50));
        assert_eq!(period_from_hz(0.0), Duration::from_secs(0));
    }
}
