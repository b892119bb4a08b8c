//! Initialize command.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::icons;
use crate::config::CONFIG_FILENAME;

const CONFIG_TEMPLATE: &str = r#"# listharvest configuration
# Every setting is optional; the values below are the defaults.

# Parser endpoint that receives POST {"url": "..."}
#endpoint = "http://localhost:3000/api/parse"

# File with one listing URL per line
#urls_file = "urls.txt"

# Where result/error/stats snapshots land
#output_dir = "parsed-data"

# Where the persistent request log lives
#state_dir = "logs"

# Random pause between requests, in milliseconds
#delay_min_ms = 30000
#delay_max_ms = 60000

# Default cap on URLs per run (0 = unlimited)
#max_requests = 100

# Write snapshot files every N completed requests
#flush_every = 10

# Abort the run once failures exceed this count
#max_failures = 5

# Retries per URL after the first attempt, with doubling backoff
#retry_budget = 3
#retry_base_ms = 1000

# Per-request timeout in seconds
#request_timeout = 30

# User agent: omit for the default, "rotate" for per-request rotation,
# or any custom string
#user_agent = "rotate"

# Extra block-page markers on top of the built-in set
#block_signatures = ["Robot Check"]
"#;

const URLS_TEMPLATE: &str = r#"# One listing URL per line. Blank lines and # comments are skipped.
# https://example.com/listing/12345
# https://example.com/listing/67890
"#;

/// Write starter config and URL files into the current directory.
pub fn cmd_init(force: bool) -> Result<()> {
    write_template(Path::new(CONFIG_FILENAME), CONFIG_TEMPLATE, force)?;
    write_template(Path::new("urls.txt"), URLS_TEMPLATE, force)?;

    println!(
        "\nEdit {} and urls.txt, then start with: harvest run",
        CONFIG_FILENAME
    );
    Ok(())
}

fn write_template(path: &Path, contents: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!(
            "{} {} already exists, keeping it (use --force to overwrite)",
            icons::warn(),
            path.display()
        );
        return Ok(());
    }

    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{} Wrote {}", icons::success(), path.display());
    Ok(())
}
