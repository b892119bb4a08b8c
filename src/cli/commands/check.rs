//! Endpoint check command.

use std::time::Duration;

use anyhow::Result;

use crate::block::BlockDetector;
use crate::cli::icons;
use crate::client::ParserClient;
use crate::config::Settings;

/// Verify the parser endpoint answers before committing to a batch.
pub async fn cmd_check(settings: &Settings, endpoint: Option<&str>) -> Result<()> {
    let endpoint = endpoint.unwrap_or(&settings.endpoint);
    let client = ParserClient::new(
        endpoint,
        Duration::from_secs(settings.request_timeout),
        settings.user_agent.as_deref(),
        BlockDetector::new(),
    );

    println!("Checking parser endpoint {}", endpoint);

    match client.preflight().await {
        Ok(status) => {
            println!("{} Endpoint is reachable (HTTP {})", icons::success(), status);
            Ok(())
        }
        Err(err) => {
            println!("{} Endpoint check failed: {}", icons::error(), err);
            std::process::exit(1);
        }
    }
}
