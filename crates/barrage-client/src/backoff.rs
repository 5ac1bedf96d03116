//! Reconnect backoff
//!
//! `delay = min(base * 2^(min(attempt, max_exponent) - 1), max) + jitter`,
//! with the sum capped at `max` again.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Delay before the first retry, before jitter
    pub base_ms: u64,
    /// Ceiling for any delay, jitter included
    pub max_ms: u64,
    /// Attempts beyond this stop doubling the base
    pub max_exponent: u32,
    /// Upper bound (exclusive) of the uniform jitter
    pub jitter_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_ms: 1_000,
            max_ms: 30_000,
            max_exponent: 6,
            jitter_ms: 800,
        }
    }
}

impl BackoffConfig {
    /// Delay without jitter for the given retry attempt (1-based)
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.clamp(1, self.max_exponent.max(1)) - 1;
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_ms.saturating_mul(factor).min(self.max_ms))
    }

    /// Delay with an explicit jitter value
    pub fn delay_with_jitter(&self, attempt: u32, jitter_ms: u64) -> Duration {
        let base = self.base_delay(attempt).as_millis() as u64;
        Duration::from_millis(base.saturating_add(jitter_ms).min(self.max_ms))
    }

    /// Delay with random jitter in `[0, jitter_ms)`
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.jitter_ms)
        } else {
            0
        };
        self.delay_with_jitter(attempt, jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_sequence() {
        let backoff = BackoffConfig::default();
        let delays: Vec<u64> = (1..=10)
            .map(|a| backoff.base_delay(a).as_millis() as u64)
            .collect();

        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 16000, 30000, 30000, 30000, 30000, 30000]
        );
    }

    #[test]
    fn test_base_delay_is_monotonic_and_capped() {
        let backoff = BackoffConfig::default();
        let mut last = Duration::ZERO;
        for attempt in 1..=10 {
            let delay = backoff.base_delay(attempt);
            assert!(delay >= last, "attempt {} went backwards", attempt);
            assert!(delay <= Duration::from_millis(30_000));
            last = delay;
        }
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = BackoffConfig::default();
        for attempt in 1..=8 {
            for _ in 0..50 {
                let delay = backoff.delay(attempt);
                let base = backoff.base_delay(attempt);
                assert!(delay >= base);
                assert!(delay < base + Duration::from_millis(800));
                assert!(delay <= Duration::from_millis(30_000));
            }
        }
    }

    #[test]
    fn test_jitter_is_capped_at_max() {
        let backoff = BackoffConfig::default();
        assert_eq!(
            backoff.delay_with_jitter(9, 799),
            Duration::from_millis(30_000)
        );
        assert_eq!(backoff.delay_with_jitter(1, 500), Duration::from_millis(1_500));
    }

    #[test]
    fn test_attempt_zero_treated_as_first() {
        let backoff = BackoffConfig::default();
        assert_eq!(backoff.base_delay(0), backoff.base_delay(1));
    }
}
