//! URL list file loading.
//!
//! One URL per line. Blank lines and lines starting with `#` are
//! skipped, so the file can carry comments. Order is preserved.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use url::Url;

use crate::models::FetchTask;

/// Load fetch tasks from a URL list file.
///
/// Lines that do not parse as absolute http(s) URLs are skipped with a
/// warning rather than failing the whole run. A `limit` of 0 means no cap.
pub fn load_tasks(path: &Path, limit: usize) -> Result<Vec<FetchTask>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL file {}", path.display()))?;

    let mut tasks = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match Url::parse(line) {
            Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {
                tasks.push(FetchTask::new(tasks.len(), line));
            }
            Ok(parsed) => {
                warn!(
                    "Skipping line {} of {}: unsupported scheme {}",
                    line_no + 1,
                    path.display(),
                    parsed.scheme()
                );
            }
            Err(err) => {
                warn!(
                    "Skipping line {} of {}: not a valid URL ({})",
                    line_no + 1,
                    path.display(),
                    err
                );
            }
        }

        if limit > 0 && tasks.len() == limit {
            debug!("URL limit of {} reached, ignoring remaining lines", limit);
            break;
        }
    }

    Ok(tasks)
}
