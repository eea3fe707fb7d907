//! Pause schedule between discovery attempts.
//!
//! ```text
//! delay = min(base * 2^(attempt-1), max) + random_jitter(0..250ms)
//! ```

use rand::{Rng, rng};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Delay before the retry that follows failed attempt number `attempt`
    /// (1-based), without jitter.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base.saturating_mul(1 << shift).min(self.max)
    }

    /// `delay_for` plus up to 250ms of jitter. A disabled backoff stays at zero.
    pub fn jittered(&self, attempt: usize) -> Duration {
        let delay = self.delay_for(attempt);
        if delay.is_zero() {
            return delay;
        }
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_and_caps() {
        let b = Backoff::new(Duration::from_millis(500), Duration::from_secs(5));
        assert_eq!(b.delay_for(1), Duration::from_millis(500));
        assert_eq!(b.delay_for(2), Duration::from_secs(1));
        assert_eq!(b.delay_for(3), Duration::from_secs(2));
        assert_eq!(b.delay_for(5), Duration::from_secs(5));
        assert_eq!(b.delay_for(1000), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_bounds() {
        let b = Backoff::new(Duration::from_secs(1), Duration::from_secs(1));
        for _ in 0..20 {
            let d = b.jittered(1);
            assert!(d >= Duration::from_secs(1));
            assert!(d <= Duration::from_millis(1250));
        }
    }

    #[test]
    fn test_none_never_sleeps() {
        assert_eq!(Backoff::none().jittered(7), Duration::ZERO);
    }
}
