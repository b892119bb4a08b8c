//! Run outcome records and summary statistics.
//!
//! These are the shapes written to the snapshot files: one record per
//! parsed URL, one failure entry per URL that could not be parsed, and
//! a derived stats block per snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A successfully parsed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRecord {
    /// The listing URL that was fetched.
    pub url: String,
    /// Extracted listing data as returned by the parser endpoint.
    pub data: Value,
    /// When the parse completed.
    pub parsed_at: DateTime<Utc>,
    /// Wall-clock request time in milliseconds.
    pub response_time_ms: u64,
}

/// A URL that failed after exhausting its retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchFailure {
    /// The listing URL that failed.
    pub url: String,
    /// Error class: network, http, blocked, parse or upstream.
    pub kind: String,
    /// Human-readable error message.
    pub error: String,
    /// When the failure was recorded.
    pub timestamp: DateTime<Utc>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every task was attempted.
    #[serde(rename = "completed")]
    Completed,
    /// A block or CAPTCHA response stopped the run.
    #[serde(rename = "aborted: blocked")]
    Blocked,
    /// Cumulative failures exceeded the configured threshold.
    #[serde(rename = "aborted: failures")]
    Failures,
    /// A daily or hourly rate limit was exhausted.
    #[serde(rename = "aborted: limit")]
    Limit,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Blocked => "aborted: blocked",
            Self::Failures => "aborted: failures",
            Self::Limit => "aborted: limit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "aborted: blocked" => Some(Self::Blocked),
            "aborted: failures" => Some(Self::Failures),
            "aborted: limit" => Some(Self::Limit),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Summary counters for a run, derived from the recorded outcomes.
///
/// `status` is only present once the run has ended; mid-run snapshots
/// omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// URLs attempted so far (successes plus failures).
    pub total_requests: usize,
    pub successful: usize,
    pub failed: usize,
    /// Successes as a percentage of attempts.
    pub success_rate: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
}
