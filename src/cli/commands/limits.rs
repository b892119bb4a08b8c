//! Rate limit management command.

use anyhow::Result;

use crate::cli::icons;
use crate::config::Settings;
use crate::rate_limit::RequestTracker;

/// Show or update the persistent rate limit budgets.
pub fn cmd_limits(
    settings: &Settings,
    daily: Option<u64>,
    hourly: Option<u64>,
    min_delay_ms: Option<u64>,
    cleanup_days: Option<i64>,
) -> Result<()> {
    let mut tracker = RequestTracker::open(&settings.state_dir)?;

    if let Some(days) = cleanup_days {
        let removed = tracker.cleanup_old_logs(days)?;
        println!(
            "{} Removed {} log entries older than {} days",
            icons::success(),
            removed,
            days
        );
    }

    if daily.is_some() || hourly.is_some() || min_delay_ms.is_some() {
        let mut limits = *tracker.limits();
        if let Some(daily) = daily {
            limits.daily_limit = daily;
        }
        if let Some(hourly) = hourly {
            limits.hourly_limit = hourly;
        }
        if let Some(min_delay) = min_delay_ms {
            limits.min_delay_ms = min_delay;
        }
        tracker.set_limits(limits)?;
        println!("{} Updated rate limits", icons::success());
    }

    let limits = tracker.limits();
    println!(
        "Current limits: {}/day, {}/hour, {}ms minimum spacing",
        limits.daily_limit, limits.hourly_limit, limits.min_delay_ms
    );

    Ok(())
}
