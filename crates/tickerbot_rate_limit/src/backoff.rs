//! Capped exponential backoff with jitter.

use crate::{RateLimitError, RateLimitErrorKind};
use derive_getters::Getters;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest exponent applied before the delay stops doubling.
pub const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Delay schedule between generation attempts.
///
/// The base delay for attempt `k` is `unit * 2^min(k, 6)`, capped at
/// `max_backoff`. A jitter in `[0, unit)` is added on top so concurrent
/// clients do not retry in lockstep.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tickerbot_rate_limit::BackoffPolicy;
///
/// let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(10)).unwrap();
/// assert_eq!(policy.base_delay(1), Duration::from_secs(2));
/// assert_eq!(policy.base_delay(3), Duration::from_secs(8));
/// assert_eq!(policy.base_delay(4), Duration::from_secs(10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Getters)]
pub struct BackoffPolicy {
    /// One time unit; the base of the exponential and the jitter width
    unit: Duration,
    /// Upper bound on the base delay
    max_backoff: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            max_backoff: Duration::from_secs(64),
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns an error if `unit` is zero.
    pub fn new(unit: Duration, max_backoff: Duration) -> Result<Self, RateLimitError> {
        if unit.is_zero() {
            return Err(RateLimitError::new(RateLimitErrorKind::InvalidBackoff(
                "unit must be greater than zero".to_string(),
            )));
        }
        Ok(Self { unit, max_backoff })
    }

    /// Policy with a one-second unit and the given cap.
    pub fn with_max_backoff(max_backoff: Duration) -> Self {
        Self {
            max_backoff,
            ..Self::default()
        }
    }

    /// Delay before jitter for the one-based `attempt`.
    ///
    /// Non-decreasing in `attempt`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.unit.saturating_mul(factor).min(self.max_backoff)
    }

    /// Delay for `attempt` with an explicit jitter fraction.
    ///
    /// `jitter` is clamped into `[0, 1)`. The added delay is floored to whole
    /// nanoseconds and always stays below one `unit`.
    pub fn delay_with_jitter(&self, attempt: u32, jitter: f64) -> Duration {
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let unit_nanos = u64::try_from(self.unit.as_nanos()).unwrap_or(u64::MAX);
        let scaled = (unit_nanos as f64 * jitter).floor() as u64;
        let extra = Duration::from_nanos(scaled.min(unit_nanos.saturating_sub(1)));
        self.base_delay(attempt) + extra
    }

    /// Delay for `attempt` with random jitter drawn from `rng`.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter: f64 = rng.gen_range(0.0..1.0);
        self.delay_with_jitter(attempt, jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_base_delay_doubles_until_exponent_cap() {
        let policy = BackoffPolicy::with_max_backoff(Duration::from_secs(1000));

        assert_eq!(policy.base_delay(0), Duration::from_secs(1));
        assert_eq!(policy.base_delay(1), Duration::from_secs(2));
        assert_eq!(policy.base_delay(2), Duration::from_secs(4));
        assert_eq!(policy.base_delay(6), Duration::from_secs(64));
        assert_eq!(policy.base_delay(7), Duration::from_secs(64));
        assert_eq!(policy.base_delay(50), Duration::from_secs(64));
    }

    #[test]
    fn test_base_delay_respects_max_backoff() {
        let policy = BackoffPolicy::with_max_backoff(Duration::from_secs(5));

        assert_eq!(policy.base_delay(2), Duration::from_secs(4));
        assert_eq!(policy.base_delay(3), Duration::from_secs(5));
        assert_eq!(policy.base_delay(6), Duration::from_secs(5));
    }

    #[test]
    fn test_base_delay_is_non_decreasing() {
        for cap in [1u64, 3, 10, 64, 500] {
            let policy = BackoffPolicy::with_max_backoff(Duration::from_secs(cap));
            let delays: Vec<Duration> = (0..20).map(|k| policy.base_delay(k)).collect();
            assert!(
                delays.windows(2).all(|w| w[0] <= w[1]),
                "delays must not decrease for cap {cap}: {delays:?}"
            );
        }
    }

    #[test]
    fn test_jittered_delay_stays_within_one_unit() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(7);

        for attempt in 0..12 {
            let base = policy.base_delay(attempt);
            for _ in 0..50 {
                let delay = policy.delay(attempt, &mut rng);
                assert!(delay >= base);
                assert!(delay < base + Duration::from_secs(1));
            }
        }
    }

    #[test]
    fn test_jitter_is_clamped() {
        let policy = BackoffPolicy::default();

        assert_eq!(policy.delay_with_jitter(1, -3.0), Duration::from_secs(2));
        assert!(policy.delay_with_jitter(1, 5.0) < Duration::from_secs(3));
        assert_eq!(policy.delay_with_jitter(1, f64::NAN), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_just_below_one_stays_under_a_unit() {
        let policy = BackoffPolicy::default();

        for jitter in [1.0 - f64::EPSILON, 1.0 - 1e-12, 0.999_999_999_9] {
            let delay = policy.delay_with_jitter(2, jitter);
            assert!(delay < Duration::from_secs(5), "{jitter} gave {delay:?}");
            assert!(delay >= Duration::from_secs(4));
        }
        assert_eq!(
            policy.delay_with_jitter(2, 1.0),
            Duration::from_secs(5) - Duration::from_nanos(1)
        );
    }

    #[test]
    fn test_zero_unit_rejected() {
        let result = BackoffPolicy::new(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(
            result.map_err(|e| e.kind().clone()),
            Err(RateLimitErrorKind::InvalidBackoff(_))
        ));
    }
}
