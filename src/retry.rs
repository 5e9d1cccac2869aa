//! Bounded retry for startup dependency checks.
//!
//! Used in two places:
//!
//! - the ingress producer connecting to Kafka (exponential backoff with jitter)
//! - the integration worker waiting for Postgres and Kafka (fixed delay)
//!
//! ```rust,ignore
//! let policy = RetryPolicy::new(10, Backoff::Fixed(Duration::from_secs(3)));
//! retry(&policy, "postgres", || store.ping()).await?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Jitter percentage for exponential backoff (±20%).
const BACKOFF_JITTER_PERCENT: f64 = 0.2;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay after every failed attempt.
    Fixed(Duration),
    /// `initial * 2^(attempt-1)`, capped at `max`, optionally jittered.
    Exponential {
        initial: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Backoff {
    /// Exponential backoff with jitter enabled.
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Backoff::Exponential {
            initial,
            max,
            jitter: true,
        }
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                max,
                jitter,
            } => {
                let base_ms = initial.as_millis() as u64;
                let delay_ms = base_ms
                    .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
                    .min(max.as_millis() as u64);

                if !jitter {
                    return Duration::from_millis(delay_ms);
                }

                let offset =
                    (delay_ms as f64 * BACKOFF_JITTER_PERCENT * (rand_jitter() * 2.0 - 1.0)) as i64;
                Duration::from_millis((delay_ms as i64 + offset).max(0) as u64)
            }
        }
    }
}

/// Returned when every attempt failed.
#[derive(Debug, Error)]
#[error("{label} not available after {attempts} attempts: {last_error}")]
pub struct RetryError<E: Display> {
    pub label: String,
    pub attempts: u32,
    pub last_error: E,
}

/// Run `operation` until it succeeds or `policy.max_attempts` is reached.
///
/// Every failure is logged with the number of attempts left. No delay is
/// applied after the final attempt.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(label, attempt, "Dependency became available");
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                return Err(RetryError {
                    label: label.to_string(),
                    attempts: attempt,
                    last_error: e,
                });
            }
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    label,
                    attempt,
                    retries_left = policy.max_attempts - attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Waiting for dependency"
                );
                sleep(delay).await;
            }
        }
    }
}

/// Generate a random jitter value between 0.0 and 1.0.
fn rand_jitter() -> f64 {
    rand::rng().random::<f64>()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Backoff::Fixed(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, RetryError<String>> = retry(&fast_policy(3), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));

        let result = retry(&fast_policy(5), "flaky", || {
            let calls = calls.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("down {n}")) } else { Ok(n) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = retry(&fast_policy(4), "postgres", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("connection refused")
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last_error, "connection refused");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            err.to_string(),
            "postgres not available after 4 attempts: connection refused"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_delay_between_attempts() {
        let policy = RetryPolicy::new(3, Backoff::Fixed(Duration::from_secs(3)));
        let started = tokio::time::Instant::now();

        let result: Result<(), _> = retry(&policy, "kafka", || async { Err("nope") }).await;

        assert!(result.is_err());
        // Two sleeps between three attempts, none after the last
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[test]
    fn test_zero_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Backoff::Fixed(Duration::ZERO));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn test_exponential_without_jitter() {
        let policy = RetryPolicy::new(
            8,
            Backoff::Exponential {
                initial: Duration::from_millis(100),
                max: Duration::from_millis(1000),
                jitter: false,
            },
        );

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(60), Duration::from_millis(1000));
    }

    #[test]
    fn test_exponential_jitter_stays_in_band() {
        let policy = RetryPolicy::new(
            8,
            Backoff::exponential(Duration::from_millis(1000), Duration::from_secs(30)),
        );

        for _ in 0..100 {
            let delay = policy.delay_for(1).as_millis();
            assert!((800..=1200).contains(&delay), "delay {delay} out of band");
        }
    }

    #[test]
    fn test_rand_jitter_returns_value_in_range() {
        for _ in 0..100 {
            let jitter = rand_jitter();
            assert!((0.0..1.0).contains(&jitter));
        }
    }
}
