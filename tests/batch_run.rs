//! End-to-end runner behavior against a scripted fetcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;

use listharvest::block::BlockSignal;
use listharvest::client::{Fetch, FetchError, FetchSuccess};
use listharvest::models::{FetchTask, RunStatus};
use listharvest::rate_limit::{DelayPolicy, RateLimits, RequestTracker, RetryPolicy, TrackedRequest};
use listharvest::runner::{BatchRunner, RunEvent, RunnerConfig};

#[derive(Debug, Clone, Copy)]
enum Step {
    Succeed,
    FailHttp,
    Block,
}

/// Fetcher that follows a fixed script keyed by the URL's trailing index.
struct ScriptedFetcher {
    steps: Vec<Step>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchSuccess, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index: usize = url.rsplit('/').next().unwrap().parse().unwrap();
        match self.steps[index] {
            Step::Succeed => Ok(FetchSuccess {
                data: json!({"id": index}),
                response_time: Duration::from_millis(5),
            }),
            Step::FailHttp => Err(FetchError::Http { status: 500 }),
            Step::Block => Err(FetchError::Blocked(BlockSignal::Status(403))),
        }
    }
}

fn tasks(n: usize) -> Vec<FetchTask> {
    (0..n)
        .map(|i| FetchTask::new(i, format!("https://example.com/listing/{}", i)))
        .collect()
}

fn config(
    output_dir: &std::path::Path,
    flush_every: usize,
    max_failures: usize,
    retry_budget: u32,
) -> RunnerConfig {
    RunnerConfig {
        output_dir: output_dir.to_path_buf(),
        delay: DelayPolicy::new(0, 0),
        retry: RetryPolicy::new(retry_budget, Duration::from_millis(1)),
        flush_every,
        max_failures,
    }
}

fn drain(rx: &mut mpsc::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Stats file with the highest timestamp holds the final run summary.
fn read_final_stats(dir: &std::path::Path) -> serde_json::Value {
    let latest = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("stats-"))
        })
        .max()
        .expect("no stats file written");
    serde_json::from_str(&std::fs::read_to_string(latest).unwrap()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_block_aborts_run_without_retrying() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut steps = vec![Step::Succeed; 10];
    steps[3] = Step::Block;
    let fetcher = Arc::new(ScriptedFetcher::new(steps));

    let runner = BatchRunner::new(fetcher.clone(), config(dir.path(), 100, 5, 3));
    let (tx, mut rx) = mpsc::channel(64);
    let stats = runner.run(tasks(10), tx).await.unwrap();

    assert_eq!(stats.total_requests, 4);
    assert_eq!(stats.successful, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.status, Some(RunStatus::Blocked));
    assert_eq!(stats.status.unwrap().as_str(), "aborted: blocked");

    // The blocked attempt must not consume the retry budget
    assert_eq!(fetcher.calls(), 4);

    let events = drain(&mut rx);
    let blocked: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, RunEvent::Blocked { .. }))
        .collect();
    assert_eq!(blocked.len(), 1);

    // Final snapshot includes both results and the blocking error
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("results-")));
    assert!(names.iter().any(|n| n.starts_with("errors-")));
    assert!(names.iter().any(|n| n.starts_with("stats-")));
}

#[tokio::test(start_paused = true)]
async fn test_too_many_failures_abort_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut steps = vec![Step::Succeed; 6];
    steps[0] = Step::FailHttp;
    steps[1] = Step::FailHttp;
    steps[2] = Step::FailHttp;
    let fetcher = Arc::new(ScriptedFetcher::new(steps));

    let runner = BatchRunner::new(fetcher.clone(), config(dir.path(), 100, 2, 0));
    let (tx, _rx) = mpsc::channel(64);
    let stats = runner.run(tasks(6), tx).await.unwrap();

    assert_eq!(stats.total_requests, 3);
    assert_eq!(stats.failed, 3);
    assert_eq!(stats.status, Some(RunStatus::Failures));
    assert_eq!(stats.status.unwrap().as_str(), "aborted: failures");
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_single_failure_does_not_stop_the_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut steps = vec![Step::Succeed; 5];
    steps[2] = Step::FailHttp;
    let fetcher = Arc::new(ScriptedFetcher::new(steps));

    let runner = BatchRunner::new(fetcher, config(dir.path(), 100, 5, 0));
    let (tx, _rx) = mpsc::channel(64);
    let stats = runner.run(tasks(5), tx).await.unwrap();

    assert_eq!(stats.total_requests, 5);
    assert_eq!(stats.successful, 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.status, Some(RunStatus::Completed));
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_every_flush_interval() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Step::Succeed; 5]));

    let runner = BatchRunner::new(fetcher, config(dir.path(), 2, 5, 0));
    let (tx, mut rx) = mpsc::channel(64);
    let stats = runner.run(tasks(5), tx).await.unwrap();
    assert_eq!(stats.successful, 5);

    // Mid-run flushes after the 2nd and 4th request; the final flush
    // emits no event
    let events = drain(&mut rx);
    let flushes: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, RunEvent::Flushed { .. }))
        .collect();
    assert_eq!(flushes.len(), 2);

    let final_stats = read_final_stats(dir.path());
    assert_eq!(final_stats["successful"], 5);
    assert_eq!(final_stats["status"], "completed");
}

#[tokio::test(start_paused = true)]
async fn test_pauses_between_requests_but_not_after_last() {
    let dir = tempfile::TempDir::new().unwrap();
    let fetcher = Arc::new(ScriptedFetcher::new(vec![Step::Succeed; 5]));

    let mut cfg = config(dir.path(), 100, 5, 0);
    cfg.delay = DelayPolicy::new(1000, 1000);
    let runner = BatchRunner::new(fetcher, cfg);
    let (tx, _rx) = mpsc::channel(64);

    let started = tokio::time::Instant::now();
    let stats = runner.run(tasks(5), tx).await.unwrap();

    // Four gaps between five requests, none after the last
    assert_eq!(started.elapsed(), Duration::from_millis(4000));
    assert_eq!(stats.successful, 5);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_tracker_budget_stops_before_fetching() {
    let output = tempfile::TempDir::new().unwrap();
    let state = tempfile::TempDir::new().unwrap();

    let mut tracker = RequestTracker::open(state.path()).unwrap();
    tracker.override_limits(RateLimits {
        daily_limit: 2,
        hourly_limit: 100,
        min_delay_ms: 0,
    });
    for i in 0..2 {
        tracker
            .log_request(TrackedRequest {
                timestamp: Utc::now(),
                url: format!("https://example.com/listing/{}", i),
                success: true,
                status_code: Some(200),
                error: None,
                response_time_ms: Some(10),
            })
            .unwrap();
    }

    let fetcher = Arc::new(ScriptedFetcher::new(vec![Step::Succeed; 3]));
    let runner =
        BatchRunner::new(fetcher.clone(), config(output.path(), 100, 5, 0)).with_tracker(tracker);
    let (tx, mut rx) = mpsc::channel(64);
    let stats = runner.run(tasks(3), tx).await.unwrap();

    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.status, Some(RunStatus::Limit));
    assert_eq!(stats.status.unwrap().as_str(), "aborted: limit");
    assert_eq!(fetcher.calls(), 0);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, RunEvent::LimitReached { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_min_delay_shortfall_is_waited_out_not_fatal() {
    let output = tempfile::TempDir::new().unwrap();
    let state = tempfile::TempDir::new().unwrap();

    let mut tracker = RequestTracker::open(state.path()).unwrap();
    tracker.override_limits(RateLimits {
        daily_limit: 100,
        hourly_limit: 100,
        min_delay_ms: 60_000,
    });
    tracker
        .log_request(TrackedRequest {
            timestamp: Utc::now(),
            url: "https://example.com/listing/0".to_string(),
            success: true,
            status_code: Some(200),
            error: None,
            response_time_ms: Some(10),
        })
        .unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new(vec![Step::Succeed; 2]));
    let runner =
        BatchRunner::new(fetcher.clone(), config(output.path(), 100, 5, 0)).with_tracker(tracker);
    let (tx, mut rx) = mpsc::channel(64);

    let started = tokio::time::Instant::now();
    let stats = runner.run(tasks(2), tx).await.unwrap();

    // Each task sleeps out the remaining spacing, then runs to completion
    assert!(started.elapsed() >= Duration::from_millis(110_000));
    assert!(started.elapsed() <= Duration::from_millis(120_000));
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.status, Some(RunStatus::Completed));
    assert_eq!(fetcher.calls(), 2);

    let events = drain(&mut rx);
    assert!(!events
        .iter()
        .any(|e| matches!(e, RunEvent::LimitReached { .. })));
}
