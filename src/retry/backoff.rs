//! Randomized exponential backoff.
//!
//! After the `n`th consecutive failure of an operation the executor sleeps
//! `base_delay * 2^k`, where `k` is drawn uniformly from `0..n`, capped at
//! `max_delay`. The randomization spreads retries of independent operations
//! apart; the cap bounds the worst single wait.

use std::time::Duration;

use rand::Rng;

/// Largest exponent ever applied. `2^31` already exceeds any sane cap.
const MAX_EXPONENT: u32 = 31;

/// Configuration for randomized exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay unit multiplied by the random power of two.
    pub base_delay: Duration,

    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryConfig {
    /// 10 second base, 30 minute cap.
    pub const DEFAULT: Self = Self {
        base_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(30 * 60),
    };

    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
        }
    }

    /// Picks the delay after `failures` consecutive failures (1-indexed).
    ///
    /// The result lies in `[base_delay, upper_bound(failures)]`.
    pub fn delay_for_failure<R: Rng + ?Sized>(&self, failures: u32, rng: &mut R) -> Duration {
        let exponent = if failures <= 1 {
            0
        } else {
            rng.gen_range(0..failures)
        };
        self.scaled(exponent)
    }

    /// The largest delay [`delay_for_failure`](Self::delay_for_failure) can
    /// return for `failures`.
    pub fn upper_bound(&self, failures: u32) -> Duration {
        self.scaled(failures.saturating_sub(1))
    }

    fn scaled(&self, exponent: u32) -> Duration {
        let multiplier = 1u32 << exponent.min(MAX_EXPONENT);
        self.base_delay
            .saturating_mul(multiplier)
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn default_config_values() {
        let config = RetryConfig::DEFAULT;
        assert_eq!(config.base_delay, Duration::from_secs(10));
        assert_eq!(config.max_delay, Duration::from_secs(1800));
    }

    #[test]
    fn first_failure_always_waits_the_base_delay() {
        let config = RetryConfig::DEFAULT;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            assert_eq!(
                config.delay_for_failure(1, &mut rng),
                Duration::from_secs(10)
            );
        }
    }

    #[test]
    fn upper_bound_doubles_then_caps() {
        let config = RetryConfig::DEFAULT;
        assert_eq!(config.upper_bound(1), Duration::from_secs(10));
        assert_eq!(config.upper_bound(2), Duration::from_secs(20));
        assert_eq!(config.upper_bound(8), Duration::from_secs(1280));
        assert_eq!(config.upper_bound(9), Duration::from_secs(1800));
        assert_eq!(config.upper_bound(u32::MAX), Duration::from_secs(1800));
    }

    #[test]
    fn huge_cap_saturates_instead_of_panicking() {
        let config = RetryConfig::new(Duration::from_secs(10), Duration::MAX);
        assert_eq!(config.upper_bound(100), Duration::from_secs(10 << 31));

        let config = RetryConfig::new(Duration::MAX, Duration::MAX);
        assert_eq!(config.upper_bound(3), Duration::MAX);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(config.delay_for_failure(40, &mut rng), Duration::MAX);
    }

    proptest! {
        #[test]
        fn delay_stays_within_bounds(seed: u64, failures in 1u32..200) {
            let config = RetryConfig::DEFAULT;
            let mut rng = StdRng::seed_from_u64(seed);
            let delay = config.delay_for_failure(failures, &mut rng);
            prop_assert!(delay >= config.base_delay);
            prop_assert!(delay <= config.upper_bound(failures));
            prop_assert!(delay <= config.max_delay);
        }

        #[test]
        fn delay_is_a_power_of_two_multiple_of_base(seed: u64, failures in 1u32..8) {
            let config = RetryConfig::new(Duration::from_secs(1), Duration::from_secs(3600));
            let mut rng = StdRng::seed_from_u64(seed);
            let secs = config.delay_for_failure(failures, &mut rng).as_secs();
            prop_assert!(secs.is_power_of_two());
        }
    }
}
