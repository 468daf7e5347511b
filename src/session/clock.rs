use std::time::Duration;

use tokio::time::Instant;

use crate::error::ConfigError;

/// One observation of the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockReading {
    pub elapsed_ms: u64,
    pub remaining_ms: u64,
    pub progress: f64,
}

impl ClockReading {
    pub fn is_finished(&self) -> bool {
        self.remaining_ms == 0
    }
}

/// Derives session time from a fixed start instant instead of counting
/// ticks, so a delayed or missed sample never stretches the session.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
    total: Duration,
}

impl SessionClock {
    pub fn new(start: Instant, total_ms: u64) -> Result<Self, ConfigError> {
        if total_ms == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        Ok(Self {
            start,
            total: Duration::from_millis(total_ms),
        })
    }

    pub fn total_ms(&self) -> u64 {
        self.total.as_millis() as u64
    }

    pub fn deadline(&self) -> Instant {
        self.start + self.total
    }

    pub fn reading_at(&self, now: Instant) -> ClockReading {
        let total_ms = self.total_ms();
        // Readings taken before `start` count as zero elapsed.
        let remaining_ms = (self.deadline().saturating_duration_since(now).as_millis() as u64)
            .min(total_ms);
        let elapsed_ms = total_ms - remaining_ms;
        let progress = (elapsed_ms as f64 / total_ms as f64).clamp(0.0, 1.0);

        ClockReading {
            elapsed_ms,
            remaining_ms,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_duration() {
        assert_eq!(
            SessionClock::new(Instant::now(), 0).unwrap_err(),
            ConfigError::ZeroDuration
        );
    }

    #[test]
    fn elapsed_and_remaining_always_sum_to_total() {
        let start = Instant::now();
        for total_ms in [1_u64, 7, 999, 30_000, 61_234] {
            let clock = SessionClock::new(start, total_ms).unwrap();
            for offset in (0..=total_ms).step_by((total_ms as usize / 13).max(1)) {
                let reading = clock.reading_at(start + Duration::from_millis(offset));
                assert_eq!(reading.elapsed_ms + reading.remaining_ms, total_ms);
                assert_eq!(reading.elapsed_ms, offset);
                let expected = offset as f64 / total_ms as f64;
                assert!((reading.progress - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn remaining_floors_at_zero_after_deadline() {
        let start = Instant::now();
        let clock = SessionClock::new(start, 5_000).unwrap();
        let reading = clock.reading_at(start + Duration::from_secs(60));
        assert_eq!(reading.remaining_ms, 0);
        assert_eq!(reading.elapsed_ms, 5_000);
        assert_eq!(reading.progress, 1.0);
        assert!(reading.is_finished());
    }

    #[test]
    fn reading_before_start_counts_as_zero_elapsed() {
        let start = Instant::now() + Duration::from_secs(10);
        let clock = SessionClock::new(start, 5_000).unwrap();
        let reading = clock.reading_at(Instant::now());
        assert_eq!(reading.elapsed_ms, 0);
        assert_eq!(reading.remaining_ms, 5_000);
        assert_eq!(reading.progress, 0.0);
    }

    #[test]
    fn breathing_example_progress() {
        let start = Instant::now();
        let clock = SessionClock::new(start, 30_000).unwrap();
        let reading = clock.reading_at(start + Duration::from_millis(10_000));
        assert!((reading.progress - 1.0 / 3.0).abs() < 1e-9);
    }
}
