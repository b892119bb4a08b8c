//! Batch run command.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use tokio::sync::mpsc;
use tracing::info;

use crate::block::BlockDetector;
use crate::cli::icons;
use crate::cli::progress::RunProgress;
use crate::client::ParserClient;
use crate::config::{RunMode, Settings};
use crate::models::RunStats;
use crate::rate_limit::{DelayPolicy, RequestTracker, RetryPolicy};
use crate::runner::{BatchRunner, RunEvent, RunnerConfig};
use crate::urlfile;

/// Fetch and parse every URL in the list, sequentially.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_run(
    settings: &Settings,
    urls: Option<PathBuf>,
    endpoint: Option<String>,
    limit: usize,
    mode: Option<RunMode>,
    output_dir: Option<PathBuf>,
    no_preflight: bool,
) -> Result<()> {
    let mut settings = settings.clone();
    if let Some(urls) = urls {
        settings.urls_file = urls;
    }
    if let Some(endpoint) = endpoint {
        settings.endpoint = endpoint;
    }
    if let Some(output_dir) = output_dir {
        settings.output_dir = output_dir;
    }
    if let Some(mode) = mode {
        settings.apply_mode(mode);
        println!("{} Using {} mode", icons::info(), mode.as_str());
    }
    settings.validate()?;
    settings
        .ensure_directories()
        .context("Failed to prepare directories")?;

    let cap = if limit > 0 { limit } else { settings.max_requests };
    let tasks = urlfile::load_tasks(&settings.urls_file, cap)?;
    if tasks.is_empty() {
        println!(
            "{} No URLs to fetch in {}",
            icons::warn(),
            settings.urls_file.display()
        );
        return Ok(());
    }

    let detector = BlockDetector::with_signatures(settings.block_signatures.clone());
    let client = ParserClient::new(
        &settings.endpoint,
        Duration::from_secs(settings.request_timeout),
        settings.user_agent.as_deref(),
        detector,
    );

    if !no_preflight {
        match client.preflight().await {
            Ok(status) => info!("Parser endpoint answered HTTP {}", status),
            Err(err) => {
                println!(
                    "{} Parser endpoint is not reachable: {}",
                    icons::error(),
                    err
                );
                println!("  Start the parser service or pass --no-preflight to skip this check");
                std::process::exit(1);
            }
        }
    }

    let mut tracker =
        RequestTracker::open(&settings.state_dir).context("Failed to open request tracker")?;
    if let Some(mode) = mode {
        let mut limits = *tracker.limits();
        limits.daily_limit = mode.daily_limit();
        tracker.override_limits(limits);
    }

    println!("Fetching {} URLs through {}", tasks.len(), settings.endpoint);
    println!(
        "  delay {}..{}ms, {} retries per URL, snapshot every {}",
        settings.delay_min_ms, settings.delay_max_ms, settings.retry_budget, settings.flush_every
    );

    let config = RunnerConfig {
        output_dir: settings.output_dir.clone(),
        delay: DelayPolicy::new(settings.delay_min_ms, settings.delay_max_ms),
        retry: RetryPolicy::new(
            settings.retry_budget,
            Duration::from_millis(settings.retry_base_ms),
        ),
        flush_every: settings.flush_every,
        max_failures: settings.max_failures,
    };
    let runner = BatchRunner::new(Arc::new(client), config).with_tracker(tracker);

    let (event_tx, mut event_rx) = mpsc::channel(64);
    let progress = RunProgress::new(tasks.len() as u64);
    let handle = tokio::spawn(runner.run(tasks, event_tx));

    while let Some(event) = event_rx.recv().await {
        match event {
            RunEvent::Started {
                ordinal,
                total,
                url,
            } => {
                progress.set_current(&format!("[{}/{}] {}", ordinal + 1, total, url));
            }
            RunEvent::Fetched {
                url,
                response_time_ms,
            } => {
                progress.println(&format!(
                    "{} {} ({}ms)",
                    icons::success(),
                    url,
                    response_time_ms
                ));
                progress.inc();
            }
            RunEvent::Failed { url, kind, error } => {
                progress.println(&format!("{} {} [{}] {}", icons::error(), url, kind, error));
                progress.inc();
            }
            RunEvent::Blocked { url, reason } => {
                progress.println(&format!(
                    "{} Block detected at {}: {}",
                    icons::error(),
                    url,
                    reason
                ));
            }
            RunEvent::Flushed { results, errors } => {
                progress.println(&format!(
                    "{} Snapshot saved ({} results, {} errors)",
                    icons::arrow(),
                    results,
                    errors
                ));
            }
            RunEvent::LimitReached { reason } => {
                progress.println(&format!("{} {}", icons::warn(), reason));
            }
        }
    }
    progress.finish();

    let stats = handle.await.context("Runner task panicked")??;
    print_summary(&stats);
    Ok(())
}

fn print_summary(stats: &RunStats) {
    println!("\n{}", style("Run summary").bold());
    println!("  Attempted:    {}", stats.total_requests);
    println!("  Successful:   {}", style(stats.successful).green());
    if stats.failed > 0 {
        println!("  Failed:       {}", style(stats.failed).red());
    } else {
        println!("  Failed:       {}", style(0).dim());
    }
    println!("  Success rate: {:.1}%", stats.success_rate);
    println!("  Duration:     {}s", stats.duration_ms / 1000);

    match &stats.status {
        Some(status) if status.is_aborted() => {
            println!("  {} Run {}", icons::error(), status.as_str());
        }
        _ => {
            println!("  {} Run completed", icons::success());
        }
    }
}
