//! Batch execution engine.
//!
//! Walks the URL list strictly in order: one request at a time, a
//! randomized pause between requests, retries with backoff on
//! transient failures, periodic snapshots, and hard stops on block
//! signals or too many failures. Separated from UI concerns - emits
//! events over a channel for progress tracking.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::Fetch;
use crate::models::{FetchTask, RunStats, RunStatus};
use crate::rate_limit::{DelayPolicy, LimitCheck, RequestTracker, RetryPolicy, TrackedRequest};
use crate::report::ResultLog;

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// A URL is about to be fetched.
    Started {
        ordinal: usize,
        total: usize,
        url: String,
    },
    /// A URL was fetched and parsed.
    Fetched { url: String, response_time_ms: u64 },
    /// A URL failed after exhausting its retries.
    Failed {
        url: String,
        kind: &'static str,
        error: String,
    },
    /// A periodic snapshot was written.
    Flushed { results: usize, errors: usize },
    /// A block signal stopped the run.
    Blocked { url: String, reason: String },
    /// A tracker budget stopped the run.
    LimitReached { reason: String },
}

/// Knobs for a single batch run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub output_dir: PathBuf,
    pub delay: DelayPolicy,
    pub retry: RetryPolicy,
    pub flush_every: usize,
    pub max_failures: usize,
}

/// Sequential batch runner over a fetcher.
pub struct BatchRunner {
    fetcher: Arc<dyn Fetch>,
    tracker: Option<RequestTracker>,
    config: RunnerConfig,
}

impl BatchRunner {
    pub fn new(fetcher: Arc<dyn Fetch>, config: RunnerConfig) -> Self {
        Self {
            fetcher,
            tracker: None,
            config,
        }
    }

    /// Attach a persistent request tracker that gates each request.
    pub fn with_tracker(mut self, tracker: RequestTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Process `tasks` in order. Always writes final snapshot files and
    /// returns the run summary, even when the run aborts early.
    pub async fn run(
        mut self,
        tasks: Vec<FetchTask>,
        event_tx: mpsc::Sender<RunEvent>,
    ) -> Result<RunStats> {
        let total = tasks.len();
        let mut log = ResultLog::new();
        let mut status = RunStatus::Completed;
        let mut since_flush = 0usize;

        for (index, task) in tasks.iter().enumerate() {
            if let Some(tracker) = &self.tracker {
                match tracker.check_limits() {
                    LimitCheck::Proceed => {}
                    LimitCheck::Wait(delay) => {
                        debug!("Minimum request spacing: waiting {}ms", delay.as_millis());
                        tokio::time::sleep(delay).await;
                    }
                    LimitCheck::Exhausted { reason } => {
                        warn!("Stopping run: {}", reason);
                        let _ = event_tx.send(RunEvent::LimitReached { reason }).await;
                        status = RunStatus::Limit;
                        break;
                    }
                }
            }

            let _ = event_tx
                .send(RunEvent::Started {
                    ordinal: task.ordinal,
                    total,
                    url: task.url.clone(),
                })
                .await;

            let retry = self.config.retry;
            let fetcher = Arc::clone(&self.fetcher);
            let url = task.url.clone();
            let outcome = retry
                .run(|| {
                    let fetcher = Arc::clone(&fetcher);
                    let url = url.clone();
                    async move { fetcher.fetch(&url).await }
                })
                .await;

            match outcome {
                Ok(fetched) => {
                    let response_time_ms = fetched.response_time.as_millis() as u64;
                    self.track(&task.url, true, None, None, Some(response_time_ms));
                    log.record_success(&task.url, fetched);
                    let _ = event_tx
                        .send(RunEvent::Fetched {
                            url: task.url.clone(),
                            response_time_ms,
                        })
                        .await;
                }
                Err(err) => {
                    let is_block = err.is_block();
                    self.track(&task.url, false, err.status(), Some(err.to_string()), None);
                    log.record_failure(&task.url, &err);

                    if is_block {
                        warn!("Aborting run: block detected at {} ({})", task.url, err);
                        let _ = event_tx
                            .send(RunEvent::Blocked {
                                url: task.url.clone(),
                                reason: err.to_string(),
                            })
                            .await;
                        status = RunStatus::Blocked;
                        break;
                    }

                    let _ = event_tx
                        .send(RunEvent::Failed {
                            url: task.url.clone(),
                            kind: err.kind(),
                            error: err.to_string(),
                        })
                        .await;

                    if log.failed() > self.config.max_failures {
                        warn!(
                            "Aborting run: {} failures exceed the limit of {}",
                            log.failed(),
                            self.config.max_failures
                        );
                        status = RunStatus::Failures;
                        break;
                    }
                }
            }

            since_flush += 1;
            if since_flush >= self.config.flush_every {
                let snapshot = log.flush(&self.config.output_dir, None)?;
                let _ = event_tx
                    .send(RunEvent::Flushed {
                        results: snapshot.successful,
                        errors: snapshot.failed,
                    })
                    .await;
                since_flush = 0;
            }

            // No pause after the final request
            if index + 1 < total {
                self.config.delay.pause().await;
            }
        }

        let stats = log.flush(&self.config.output_dir, Some(status))?;
        Ok(stats)
    }

    fn track(
        &mut self,
        url: &str,
        success: bool,
        status_code: Option<u16>,
        error: Option<String>,
        response_time_ms: Option<u64>,
    ) {
        if let Some(tracker) = &mut self.tracker {
            let entry = TrackedRequest {
                timestamp: Utc::now(),
                url: url.to_string(),
                success,
                status_code,
                error,
                response_time_ms,
            };
            if let Err(err) = tracker.log_request(entry) {
                warn!("Failed to record request in tracker: {}", err);
            }
        }
    }
}
