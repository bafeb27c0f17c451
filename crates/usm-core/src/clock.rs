use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{PoolError, Result};

/// Simulated clock.
///
/// Time only moves when [`Clock::advance`] is called, so every decay
/// computation is a pure function of the instruction sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    /// Seconds since the Unix epoch.
    now: f64,
}

impl Clock {
    pub fn new(start: f64) -> Self {
        Self { now: start }
    }

    /// Current time in seconds since the Unix epoch.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move time forward by `delta_secs`; zero is accepted, negative or
    /// non-finite deltas are not.
    pub fn advance(&mut self, delta_secs: f64) -> Result<f64> {
        if !(delta_secs.is_finite() && delta_secs >= 0.0) {
            return Err(PoolError::InvalidInput(format!(
                "time delta must be a non-negative finite number of seconds, got {}",
                delta_secs
            )));
        }
        self.now += delta_secs;
        debug!(now = self.now, delta_secs, "Clock advanced");
        Ok(self.now)
    }

    /// Current time as a UTC timestamp, truncated to milliseconds.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis((self.now * 1000.0).floor() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_accumulates() {
        let mut clock = Clock::new(100.0);
        clock.advance(30.0).unwrap();
        clock.advance(0.0).unwrap();
        clock.advance(0.5).unwrap();
        assert_eq!(clock.now(), 130.5);
    }

    #[test]
    fn advance_rejects_negative_and_nan() {
        let mut clock = Clock::new(100.0);
        assert!(matches!(clock.advance(-1.0), Err(PoolError::InvalidInput(_))));
        assert!(clock.advance(f64::NAN).is_err());
        assert_eq!(clock.now(), 100.0);
    }

    #[test]
    fn datetime_matches_epoch_seconds() {
        let clock = Clock::new(1_596_240_000.0);
        let dt = clock.datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2020-08-01T00:00:00+00:00");
    }
}
