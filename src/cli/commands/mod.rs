//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod check;
mod init;
mod limits;
mod run;
mod stats;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{load_settings, RunMode};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Sequential batch fetcher for listing pages via a local parser endpoint")]
#[command(version)]
pub struct Cli {
    /// Path to a config file (default: ./listharvest.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Check for the verbose flag before clap parsing, for logger setup.
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a starter config and URL file in the current directory
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Verify the parser endpoint is reachable
    Check {
        /// Endpoint URL to check instead of the configured one
        #[arg(long, env = "LISTHARVEST_ENDPOINT")]
        endpoint: Option<String>,
    },

    /// Fetch and parse every URL in the list
    Run {
        /// URL list file (default from config)
        #[arg(short, long)]
        urls: Option<PathBuf>,

        /// Parser endpoint URL
        #[arg(long, env = "LISTHARVEST_ENDPOINT")]
        endpoint: Option<String>,

        /// Cap on URLs this run; 0 uses the configured maximum
        #[arg(short, long, default_value = "0")]
        limit: usize,

        /// Pacing preset overriding the configured delays
        #[arg(long, value_enum)]
        mode: Option<RunMode>,

        /// Directory for snapshot files
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Skip the endpoint reachability check
        #[arg(long)]
        no_preflight: bool,
    },

    /// Show cumulative request statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or update rate limit budgets
    Limits {
        /// Daily request budget
        #[arg(long)]
        daily: Option<u64>,

        /// Hourly request budget
        #[arg(long)]
        hourly: Option<u64>,

        /// Minimum spacing between requests in milliseconds
        #[arg(long)]
        min_delay_ms: Option<u64>,

        /// Remove log entries older than this many days
        #[arg(long)]
        cleanup_days: Option<i64>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // init never reads an existing config file
        Commands::Init { force } => init::cmd_init(force),
        Commands::Check { endpoint } => {
            let settings = load_settings(cli.config).await?;
            check::cmd_check(&settings, endpoint.as_deref()).await
        }
        Commands::Run {
            urls,
            endpoint,
            limit,
            mode,
            output_dir,
            no_preflight,
        } => {
            let settings = load_settings(cli.config).await?;
            run::cmd_run(
                &settings,
                urls,
                endpoint,
                limit,
                mode,
                output_dir,
                no_preflight,
            )
            .await
        }
        Commands::Stats { json } => {
            let settings = load_settings(cli.config).await?;
            stats::cmd_stats(&settings, json)
        }
        Commands::Limits {
            daily,
            hourly,
            min_delay_ms,
            cleanup_days,
        } => {
            let settings = load_settings(cli.config).await?;
            limits::cmd_limits(&settings, daily, hourly, min_delay_ms, cleanup_days)
        }
    }
}
