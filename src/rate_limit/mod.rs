//! Request pacing: randomized inter-request delays, retry backoff, and
//! persistent request accounting.

mod retry;
mod tracker;

pub use retry::RetryPolicy;
pub use tracker::{
    LimitCheck, RateLimits, RequestTracker, TrackedRequest, TrackerError, TrackerStats,
};

use std::time::Duration;

use tracing::debug;

/// Uniform random delay between consecutive requests.
///
/// Randomized spacing avoids the fixed-interval fingerprint that gets
/// batch clients flagged. Bounds are validated upstream by
/// `Settings::validate`, so `min_ms <= max_ms` holds here.
#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    min_ms: u64,
    max_ms: u64,
}

impl DelayPolicy {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw a delay uniformly from `[min, max]`.
    pub fn sample(&self) -> Duration {
        Duration::from_millis(rand::random_range(self.min_ms..=self.max_ms))
    }

    /// Sleep for a freshly sampled delay.
    pub async fn pause(&self) {
        let delay = self.sample();
        debug!("Pausing {}ms before next request", delay.as_millis());
        tokio::time::sleep(delay).await;
    }
}
