//! Persistent request accounting across runs.
//!
//! Every request is appended to a JSONL log and folded into rolling
//! counters, so daily and hourly budgets survive process restarts.
//! Day and hour windows roll over lazily: counters are reinterpreted
//! against the current clock whenever they are read.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Append-only log of individual requests.
const REQUEST_LOG_FILE: &str = "requests.jsonl";
/// Rolling counters derived from the log.
const STATS_FILE: &str = "stats.json";
/// User-configured budget limits.
const LIMITS_FILE: &str = "rate-limits.json";

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One logged request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedRequest {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
}

/// Rolling counters persisted between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_request_at: Option<DateTime<Utc>>,
    pub requests_today: u64,
    pub requests_this_hour: u64,
    pub average_response_time_ms: Option<f64>,
}

/// Budget limits enforced before each request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimits {
    pub daily_limit: u64,
    pub hourly_limit: u64,
    pub min_delay_ms: u64,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            daily_limit: 10_000,
            hourly_limit: 500,
            min_delay_ms: 1_000,
        }
    }
}

/// Outcome of a pre-request budget check.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitCheck {
    /// Budgets allow the request now.
    Proceed,
    /// Minimum spacing not yet elapsed; wait this long first.
    Wait(Duration),
    /// A daily or hourly budget is spent.
    Exhausted { reason: String },
}

/// Tracks request history and enforces budgets from a state directory.
#[derive(Debug)]
pub struct RequestTracker {
    dir: PathBuf,
    stats: TrackerStats,
    limits: RateLimits,
}

impl RequestTracker {
    /// Open (or initialize) tracker state in `dir`.
    ///
    /// A corrupt stats file is replaced with zeroed counters since it
    /// is only bookkeeping. A corrupt limits file is an error: silently
    /// reverting user-set budgets to defaults could raise them.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| TrackerError::Io {
            path: dir.clone(),
            source,
        })?;

        let stats_path = dir.join(STATS_FILE);
        let stats = match std::fs::read_to_string(&stats_path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Resetting corrupt stats file {}: {}",
                    stats_path.display(),
                    err
                );
                TrackerStats::default()
            }),
            Err(_) => TrackerStats::default(),
        };

        let limits_path = dir.join(LIMITS_FILE);
        let limits = match std::fs::read_to_string(&limits_path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| TrackerError::Json {
                    path: limits_path.clone(),
                    source,
                })?
            }
            Err(_) => RateLimits::default(),
        };

        Ok(Self { dir, stats, limits })
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    pub fn limits(&self) -> &RateLimits {
        &self.limits
    }

    /// Replace limits and persist them.
    pub fn set_limits(&mut self, limits: RateLimits) -> Result<(), TrackerError> {
        self.limits = limits;
        write_json(&self.dir.join(LIMITS_FILE), &self.limits)
    }

    /// Replace limits for this process only, without persisting.
    pub fn override_limits(&mut self, limits: RateLimits) {
        self.limits = limits;
    }

    /// Check budgets against the current clock.
    pub fn check_limits(&self) -> LimitCheck {
        let now = Utc::now();
        let (today, this_hour) = self.effective_counts(now);

        if today >= self.limits.daily_limit {
            return LimitCheck::Exhausted {
                reason: format!("Daily limit of {} requests reached", self.limits.daily_limit),
            };
        }
        if this_hour >= self.limits.hourly_limit {
            return LimitCheck::Exhausted {
                reason: format!(
                    "Hourly limit of {} requests reached",
                    self.limits.hourly_limit
                ),
            };
        }

        if let Some(last) = self.stats.last_request_at {
            let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;
            if elapsed_ms < self.limits.min_delay_ms {
                return LimitCheck::Wait(Duration::from_millis(
                    self.limits.min_delay_ms - elapsed_ms,
                ));
            }
        }

        LimitCheck::Proceed
    }

    /// Append a request to the log and fold it into the counters.
    pub fn log_request(&mut self, entry: TrackedRequest) -> Result<(), TrackerError> {
        let log_path = self.dir.join(REQUEST_LOG_FILE);
        let line = serde_json::to_string(&entry).map_err(|source| TrackerError::Json {
            path: log_path.clone(),
            source,
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .map_err(|source| TrackerError::Io {
                path: log_path.clone(),
                source,
            })?;
        writeln!(file, "{}", line).map_err(|source| TrackerError::Io {
            path: log_path,
            source,
        })?;

        let (today, this_hour) = self.effective_counts(entry.timestamp);
        self.stats.requests_today = today + 1;
        self.stats.requests_this_hour = this_hour + 1;
        self.stats.total_requests += 1;
        if entry.success {
            self.stats.successful_requests += 1;
        } else {
            self.stats.failed_requests += 1;
        }
        if let Some(ms) = entry.response_time_ms {
            let total = self.stats.total_requests as f64;
            self.stats.average_response_time_ms =
                Some(match self.stats.average_response_time_ms {
                    None => ms as f64,
                    Some(avg) => (avg * (total - 1.0) + ms as f64) / total,
                });
        }
        self.stats.last_request_at = Some(entry.timestamp);

        write_json(&self.dir.join(STATS_FILE), &self.stats)
    }

    /// Read logged requests, optionally bounded by time.
    pub fn export_logs(
        &self,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<TrackedRequest>, TrackerError> {
        let log_path = self.dir.join(REQUEST_LOG_FILE);
        let contents = match std::fs::read_to_string(&log_path) {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        let mut entries = Vec::new();
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackedRequest>(line) {
                Ok(entry) => {
                    if since.is_some_and(|bound| entry.timestamp < bound) {
                        continue;
                    }
                    if until.is_some_and(|bound| entry.timestamp > bound) {
                        continue;
                    }
                    entries.push(entry);
                }
                Err(err) => {
                    warn!("Skipping corrupt log entry in {}: {}", log_path.display(), err);
                }
            }
        }
        Ok(entries)
    }

    /// Drop log entries older than `keep_days`. Returns how many were removed.
    pub fn cleanup_old_logs(&self, keep_days: i64) -> Result<usize, TrackerError> {
        let log_path = self.dir.join(REQUEST_LOG_FILE);
        let contents = match std::fs::read_to_string(&log_path) {
            Ok(contents) => contents,
            Err(_) => return Ok(0),
        };

        let cutoff = Utc::now() - chrono::Duration::days(keep_days);
        let mut kept = Vec::new();
        let mut removed = 0usize;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TrackedRequest>(line) {
                Ok(entry) if entry.timestamp >= cutoff => kept.push(line.to_string()),
                Ok(_) => removed += 1,
                Err(err) => {
                    warn!("Dropping corrupt log entry in {}: {}", log_path.display(), err);
                    removed += 1;
                }
            }
        }

        let mut output = kept.join("\n");
        if !output.is_empty() {
            output.push('\n');
        }
        std::fs::write(&log_path, output).map_err(|source| TrackerError::Io {
            path: log_path,
            source,
        })?;
        Ok(removed)
    }

    /// Counters reinterpreted at `now`: a new day zeroes both windows,
    /// a new hour zeroes the hourly window.
    fn effective_counts(&self, now: DateTime<Utc>) -> (u64, u64) {
        match self.stats.last_request_at {
            Some(last) if last.date_naive() == now.date_naive() => {
                let this_hour = if last.hour() == now.hour() {
                    self.stats.requests_this_hour
                } else {
                    0
                };
                (self.stats.requests_today, this_hour)
            }
            _ => (0, 0),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), TrackerError> {
    let contents = serde_json::to_string_pretty(value).map_err(|source| TrackerError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, contents).map_err(|source| TrackerError::Io {
        path: path.to_path_buf(),
        source,
    })
}
