//! Statistics command.

use anyhow::Result;
use console::style;

use crate::config::Settings;
use crate::rate_limit::RequestTracker;

/// Show cumulative request statistics from the tracker.
pub fn cmd_stats(settings: &Settings, json: bool) -> Result<()> {
    let tracker = RequestTracker::open(&settings.state_dir)?;
    let stats = tracker.stats();

    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("{}", style("Request statistics").bold());
    println!("  Total requests:  {}", stats.total_requests);
    println!("  Successful:      {}", stats.successful_requests);
    println!("  Failed:          {}", stats.failed_requests);
    println!("  Today:           {}", stats.requests_today);
    println!("  This hour:       {}", stats.requests_this_hour);
    if let Some(avg) = stats.average_response_time_ms {
        println!("  Avg response:    {:.0}ms", avg);
    }
    if let Some(last) = stats.last_request_at {
        println!(
            "  Last request:    {}",
            last.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    let limits = tracker.limits();
    println!(
        "\n  Limits: {}/day, {}/hour, {}ms spacing",
        limits.daily_limit, limits.hourly_limit, limits.min_delay_ms
    );

    Ok(())
}
