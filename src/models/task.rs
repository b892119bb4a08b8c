//! Fetch tasks fed to the batch runner.

/// One URL to fetch, with its position in the run.
///
/// Tasks are immutable once loaded; outcomes are recorded separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTask {
    /// Zero-based position in the run.
    pub ordinal: usize,
    /// Absolute listing URL.
    pub url: String,
}

impl FetchTask {
    /// Create a task for a URL at the given run position.
    pub fn new(ordinal: usize, url: impl Into<String>) -> Self {
        Self {
            ordinal,
            url: url.into(),
        }
    }
}
