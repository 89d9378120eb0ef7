//! Monotonic time base for detection calls

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use super::types::Timestamp;

/// Pipeline clock used to stamp inference calls
///
/// Video-mode landmark engines require every call to carry a timestamp
/// strictly greater than the previous one. Two ticks can land inside the same
/// microsecond on a fast host, so [`PipelineClock::next_detection_timestamp`]
/// bumps the value when needed.
///
/// # Thread Safety
///
/// The clock can be cloned freely; clones share the base and the last issued
/// timestamp.
#[derive(Clone)]
pub struct PipelineClock {
    /// Base instant when the clock started
    base: Arc<Instant>,

    /// Last timestamp handed to a detector (microseconds), -1 before the first
    last_detection: Arc<AtomicI64>,
}

impl PipelineClock {
    /// Create a new clock starting now
    pub fn new() -> Self {
        Self::with_base(Instant::now())
    }

    /// Create a new clock with a specific base instant
    pub fn with_base(base: Instant) -> Self {
        Self {
            base: Arc::new(base),
            last_detection: Arc::new(AtomicI64::new(-1)),
        }
    }

    /// Get the base instant
    pub fn base(&self) -> Instant {
        *self.base
    }

    /// Time elapsed since the clock started
    pub fn elapsed(&self) -> Duration {
        self.base.elapsed()
    }

    /// Current timestamp relative to the clock base
    pub fn now(&self) -> Timestamp {
        Timestamp::from_duration(self.base.elapsed())
    }

    /// Timestamp for the next detection call, strictly increasing across calls
    pub fn next_detection_timestamp(&self) -> Timestamp {
        let now = self.now().micros;
        let prev = self
            .last_detection
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        Timestamp::from_micros(now.max(prev + 1))
    }

    /// Last timestamp handed out by [`Self::next_detection_timestamp`]
    pub fn last_detection_timestamp(&self) -> Option<Timestamp> {
        match self.last_detection.load(Ordering::Acquire) {
            micros if micros < 0 => None,
            micros => Some(Timestamp::from_micros(micros)),
        }
    }
}

impl Default for PipelineClock {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineClock")
            .field("elapsed", &self.base.elapsed())
            .field("last_detection", &self.last_detection_timestamp())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_basic() {
        let clock = PipelineClock::new();

        thread::sleep(Duration::from_millis(10));

        let ts = clock.now();
        assert!(ts.micros >= 10_000);
        assert!(clock.last_detection_timestamp().is_none());
    }

    #[test]
    fn test_detection_timestamps_strictly_increase() {
        let clock = PipelineClock::new();

        let mut prev = clock.next_detection_timestamp();
        for _ in 0..1_000 {
            let next = clock.next_detection_timestamp();
            assert!(next > prev, "{} should be after {}", next, prev);
            prev = next;
        }
        assert_eq!(clock.last_detection_timestamp(), Some(prev));
    }

    #[test]
    fn test_clones_share_sequence() {
        let clock = PipelineClock::new();
        let other = clock.clone();

        let a = clock.next_detection_timestamp();
        let b = other.next_detection_timestamp();
        let c = clock.next_detection_timestamp();

        assert!(a < b);
        assert!(b < c);
    }
}
