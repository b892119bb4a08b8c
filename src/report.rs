//! In-memory result accumulation and snapshot files.
//!
//! Results and errors stay in memory for the whole run. Every flush
//! writes the cumulative state to fresh timestamped files rather than
//! rewriting earlier snapshots, so a crash loses at most one flush
//! interval of work.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::client::{FetchError, FetchSuccess};
use crate::models::{FetchFailure, FetchRecord, RunStats, RunStatus};

/// Accumulates per-URL outcomes and writes snapshot files.
#[derive(Debug)]
pub struct ResultLog {
    results: Vec<FetchRecord>,
    errors: Vec<FetchFailure>,
    started_at: chrono::DateTime<Utc>,
}

impl Default for ResultLog {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            errors: Vec::new(),
            started_at: Utc::now(),
        }
    }
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, url: &str, success: FetchSuccess) {
        self.results.push(FetchRecord {
            url: url.to_string(),
            data: success.data,
            parsed_at: Utc::now(),
            response_time_ms: success.response_time.as_millis() as u64,
        });
    }

    pub fn record_failure(&mut self, url: &str, error: &FetchError) {
        self.errors.push(FetchFailure {
            url: url.to_string(),
            kind: error.kind().to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn attempted(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Summarize the run so far. `status` is set only on final stats.
    pub fn stats(&self, status: Option<RunStatus>) -> RunStats {
        let finished_at = Utc::now();
        let attempted = self.attempted();
        let success_rate = if attempted > 0 {
            self.succeeded() as f64 * 100.0 / attempted as f64
        } else {
            0.0
        };

        RunStats {
            total_requests: attempted,
            successful: self.succeeded(),
            failed: self.failed(),
            success_rate,
            started_at: self.started_at,
            finished_at,
            duration_ms: (finished_at - self.started_at).num_milliseconds().max(0) as u64,
            status,
        }
    }

    /// Write a cumulative snapshot to `dir`.
    ///
    /// All three files share one timestamp stamp. Result and error
    /// files are only written when non-empty; stats always are.
    pub fn flush(&self, dir: &Path, status: Option<RunStatus>) -> Result<RunStats> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

        let stamp = Utc::now().timestamp_millis();

        if !self.results.is_empty() {
            let path = dir.join(format!("results-{}.json", stamp));
            let contents = serde_json::to_string_pretty(&self.results)?;
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        if !self.errors.is_empty() {
            let path = dir.join(format!("errors-{}.json", stamp));
            let contents = serde_json::to_string_pretty(&self.errors)?;
            std::fs::write(&path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let stats = self.stats(status);
        let stats_path = dir.join(format!("stats-{}.json", stamp));
        let contents = serde_json::to_string_pretty(&stats)?;
        std::fs::write(&stats_path, contents)
            .with_context(|| format!("Failed to write {}", stats_path.display()))?;

        info!(
            "Snapshot {}: {} results, {} errors",
            stamp,
            self.results.len(),
            self.errors.len()
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockSignal;
    use serde_json::json;
    use std::time::Duration;

    fn success(data: serde_json::Value) -> FetchSuccess {
        FetchSuccess {
            data,
            response_time: Duration::from_millis(42),
        }
    }

    #[test]
    fn test_flush_writes_cumulative_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut log = ResultLog::new();

        log.record_success("https://example.com/1", success(json!({"price": 100})));
        log.record_success("https://example.com/2", success(json!({"price": 200})));
        log.record_failure("https://example.com/3", &FetchError::Http { status: 500 });

        let stats = log.flush(dir.path(), None).unwrap();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert!((stats.success_rate - 66.666).abs() < 0.1);
        assert!(stats.status.is_none());

        let mut results = 0;
        let mut errors = 0;
        let mut stats_files = 0;
        for file in std::fs::read_dir(dir.path()).unwrap() {
            let name = file.unwrap().file_name().into_string().unwrap();
            if name.starts_with("results-") {
                results += 1;
            } else if name.starts_with("errors-") {
                errors += 1;
            } else if name.starts_with("stats-") {
                stats_files += 1;
            }
        }
        assert_eq!((results, errors, stats_files), (1, 1, 1));
    }

    #[test]
    fn test_empty_log_writes_only_stats() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = ResultLog::new();

        let stats = log.flush(dir.path(), Some(RunStatus::Completed)).unwrap();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.success_rate, 0.0);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("stats-"));
    }

    #[test]
    fn test_final_stats_carry_abort_status() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut log = ResultLog::new();
        log.record_failure(
            "https://example.com/1",
            &FetchError::Blocked(BlockSignal::Status(403)),
        );

        let stats = log.flush(dir.path(), Some(RunStatus::Blocked)).unwrap();
        assert_eq!(stats.status, Some(RunStatus::Blocked));

        let stats_file = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("stats-"))
            })
            .unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(stats_file).unwrap()).unwrap();
        assert_eq!(parsed["status"], "aborted: blocked");
    }

    #[test]
    fn test_error_entries_keep_kind_and_message() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut log = ResultLog::new();
        log.record_failure(
            "https://example.com/x",
            &FetchError::Upstream("selector not found".to_string()),
        );
        log.flush(dir.path(), None).unwrap();

        let errors_file = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("errors-"))
            })
            .unwrap();
        let parsed: Vec<FetchFailure> =
            serde_json::from_str(&std::fs::read_to_string(errors_file).unwrap()).unwrap();
        assert_eq!(parsed[0].url, "https://example.com/x");
        assert_eq!(parsed[0].kind, "upstream");
        assert!(parsed[0].error.contains("selector not found"));
    }
}
