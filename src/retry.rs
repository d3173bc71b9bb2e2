//! Bounded retry with exponential backoff under a wall-clock deadline.
//!
//! Remote updates and deletes are re-attempted while the remote reports a
//! transient failure (see [`ProviderError::is_retryable`]). Attempts stop
//! when the operation succeeds, when a terminal error is returned, or when
//! the deadline has passed. Time is read and slept through a [`Clock`] so
//! tests can drive the loop with simulated time.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Source of time for retry loops.
#[async_trait]
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry schedule for a single remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Wall-clock budget measured from the first attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Initial delay between attempts.
    pub const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
    /// Cap on the delay between attempts.
    pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

    /// Create a policy with the default backoff and the given deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            initial_backoff: Self::INITIAL_BACKOFF,
            max_backoff: Self::MAX_BACKOFF,
            timeout,
        }
    }

    /// The delay that follows `current`.
    pub fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails terminally or the deadline passes.
    ///
    /// Attempts are strictly sequential. The delay before an attempt never
    /// extends past the deadline, so the loop gives up no later than
    /// `timeout` after it started (plus the duration of the last attempt).
    pub async fn run<F, Fut, T>(
        &self,
        clock: &dyn Clock,
        operation: &str,
        mut attempt_fn: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let started = clock.now();
        // A timeout too large to represent as an instant means no deadline.
        let deadline = started.checked_add(self.timeout);
        let mut backoff = self.initial_backoff;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let err = match attempt_fn().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                },
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            let now = clock.now();
            if deadline.is_some_and(|deadline| now >= deadline) {
                warn!(
                    operation,
                    attempt,
                    timeout = ?self.timeout,
                    error = %err,
                    "giving up on retryable error"
                );
                return Err(ProviderError::DeadlineExceeded(format!(
                    "{} did not complete within {:?} ({} attempt(s)), last error: {}",
                    operation, self.timeout, attempt, err
                )));
            }

            let delay = match deadline {
                Some(deadline) => backoff.min(deadline - now),
                None => backoff,
            };
            debug!(operation, attempt, delay = ?delay, error = %err, "retrying after transient error");
            clock.sleep(delay).await;
            backoff = self.next_backoff(backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> ProviderError {
        ProviderError::Unavailable("busy".to_string())
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::with_timeout(Duration::from_secs(60));
        let mut delays = vec![policy.initial_backoff];
        for _ in 0..6 {
            let next = policy.next_backoff(*delays.last().unwrap());
            delays.push(next);
        }
        let millis: Vec<u128> = delays.iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![500, 1000, 2000, 4000, 8000, 10000, 10000]);
    }

    #[tokio::test]
    async fn test_succeeds_on_first_try() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::with_timeout(Duration::from_secs(60));
        let result = policy.run(&clock, "noop", || async { Ok::<_, ProviderError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::with_timeout(Duration::from_secs(60));

        let result = policy
            .run(&clock, "flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n <= 3 {
                        Err(unavailable())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.elapsed(), Duration::from_millis(500 + 1000 + 2000));
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::with_timeout(Duration::from_secs(60));

        let err = policy
            .run(&clock, "bad", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ProviderError::InvalidRequest("nope".to_string())) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidRequest(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(clock.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_gives_up_at_deadline() {
        let clock = ManualClock::new();
        let timeout = Duration::from_secs(5 * 60);
        let policy = RetryPolicy::with_timeout(timeout);

        let err = policy
            .run(&clock, "always_busy", || async { Err::<(), _>(unavailable()) })
            .await
            .unwrap_err();

        assert!(err.is_deadline_exceeded());
        assert!(err.to_string().contains("always_busy"));
        assert_eq!(clock.elapsed(), timeout);
    }

    #[tokio::test]
    async fn test_last_delay_is_clamped_to_deadline() {
        let clock = ManualClock::new();
        let policy = RetryPolicy::with_timeout(Duration::from_millis(1200));

        let err = policy
            .run(&clock, "short", || async { Err::<(), _>(unavailable()) })
            .await
            .unwrap_err();

        assert!(err.is_deadline_exceeded());
        // 500ms, then 700ms instead of 1000ms
        assert_eq!(clock.elapsed(), Duration::from_millis(1200));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(500), Duration::from_millis(700)]);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let clock = ManualClock::new();
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::with_timeout(Duration::from_secs(u64::MAX));

        let result = policy
            .run(&clock, "patient", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n <= 8 {
                        Err(unavailable())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 9);
        assert_eq!(clock.sleeps().last(), Some(&RetryPolicy::MAX_BACKOFF));
    }
}
