//! Exponential backoff for connection attempts.
//!
//! The delay before attempt `n` (counting from zero since the last success)
//! is `base * 2^n`. Once the counter passes the configured maximum it wraps
//! to zero, so the delay cycles instead of growing without bound.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Backoff
// ============================================================================

/// Retry counter with doubling delay and wraparound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max_retry: u32,
    retry: u32,
}

impl Backoff {
    /// Creates a backoff starting at `base`, wrapping after `max_retry`.
    #[inline]
    #[must_use]
    pub const fn new(base: Duration, max_retry: u32) -> Self {
        Self {
            base,
            max_retry,
            retry: 0,
        }
    }

    /// Returns the current retry counter.
    #[inline]
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry
    }

    /// Returns the delay for a given counter value.
    #[inline]
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base.saturating_mul(1u32 << retry.min(31))
    }

    /// Returns the delay for the next attempt and advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.retry);
        self.retry += 1;
        if self.retry > self.max_retry {
            self.retry = 0;
        }
        delay
    }

    /// Resets the counter after a successful connection.
    #[inline]
    pub fn reset(&mut self) {
        self.retry = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_doubling_then_wrap() {
        let mut backoff = Backoff::new(Duration::from_millis(1000), 4);
        let delays: Vec<u64> = (0..7)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 1000, 2000]);
    }

    #[test]
    fn test_reset() {
        let mut backoff = Backoff::new(Duration::from_secs(1), 4);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.retry_count(), 2);

        backoff.reset();
        assert_eq!(backoff.retry_count(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_max_retry_never_grows() {
        let mut backoff = Backoff::new(Duration::from_millis(250), 0);
        for _ in 0..3 {
            assert_eq!(backoff.next_delay(), Duration::from_millis(250));
            assert_eq!(backoff.retry_count(), 0);
        }
    }

    proptest! {
        #[test]
        fn prop_nth_delay_is_base_times_power_of_two(max_retry in 0u32..10, calls in 1usize..40) {
            let base = Duration::from_millis(1000);
            let mut backoff = Backoff::new(base, max_retry);

            for n in 0..calls {
                let expected_exp = (n as u32) % (max_retry + 1);
                prop_assert_eq!(backoff.next_delay(), base * 2u32.pow(expected_exp));
                prop_assert!(backoff.retry_count() <= max_retry);
            }
        }
    }
}
