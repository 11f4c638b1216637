//! Exponential backoff shared by settlement retries and redelivery.

use std::time::Duration;

/// Tunable parameters for an exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl BackoffConfig {
    /// Short delays for re-running a conflicting transaction.
    pub fn transaction() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(250),
            multiplier: 2.0,
        }
    }

    /// Longer delays for redelivering a failed trigger invocation.
    pub fn delivery() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = BackoffConfig::delivery();
        let d = next_delay(Duration::from_secs(1), &config);
        assert_eq!(d, Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = BackoffConfig {
            max_delay: Duration::from_secs(10),
            ..BackoffConfig::delivery()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn transaction_backoff_stays_short() {
        let config = BackoffConfig::transaction();
        let mut delay = config.initial_delay;
        for _ in 0..10 {
            delay = next_delay(delay, &config);
        }
        assert_eq!(delay, Duration::from_millis(250));
    }
}
