//! Retry with exponential backoff for transient fetch failures.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::client::FetchError;
use crate::config::{DEFAULT_RETRY_BASE_MS, DEFAULT_RETRY_BUDGET};

/// Bounded retry with doubling backoff.
///
/// A budget of 3 means up to 4 attempts total: the first call plus
/// three retries at base, 2x base, and 4x base delays.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    budget: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_BUDGET, Duration::from_millis(DEFAULT_RETRY_BASE_MS))
    }
}

impl RetryPolicy {
    pub fn new(budget: u32, base_delay: Duration) -> Self {
        Self { budget, base_delay }
    }

    /// Backoff before retry number `attempt` (zero-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    /// Run `op`, retrying while it fails retryably and budget remains.
    ///
    /// Non-retryable errors (blocks, parse failures) surface on the
    /// first occurrence without consuming the budget.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.budget => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "Attempt {} failed ({}), retrying in {}ms",
                        attempt + 1,
                        err,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockSignal;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_budget_bounds_total_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let result: Result<(), FetchError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Http { status: 500 }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_is_not_retried() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let result: Result<(), FetchError> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(FetchError::Blocked(BlockSignal::Status(403))) }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Blocked(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|| {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(FetchError::Http { status: 502 })
                    } else {
                        Ok(call)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4000));
    }
}
