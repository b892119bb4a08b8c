//! HTTP client for the parser endpoint.
//!
//! Every page goes through a local parser service: we POST the target
//! URL and get extracted fields back as JSON. The client classifies
//! each response so the runner can tell transient failures from blocks.

mod response;
mod user_agent;

pub use response::{FetchSuccess, ParseReply};
pub use user_agent::{resolve_user_agent, ROTATION_USER_AGENTS, USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::block::{BlockDetector, BlockSignal};

/// Why a fetch through the parser endpoint failed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure reaching the endpoint.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("endpoint returned HTTP {status}")]
    Http { status: u16 },

    /// Response classified as a block or CAPTCHA page.
    #[error("blocked: {0}")]
    Blocked(BlockSignal),

    /// Endpoint body was not the expected JSON shape.
    #[error("invalid endpoint response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint reached the page but reported a parse failure.
    #[error("endpoint reported: {0}")]
    Upstream(String),
}

impl FetchError {
    /// Short machine-readable category for error snapshots.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Blocked(_) => "blocked",
            Self::Parse(_) => "parse",
            Self::Upstream(_) => "upstream",
        }
    }

    /// Whether retrying the same URL might succeed.
    ///
    /// Blocks are never retried; hammering a blocking site makes it
    /// worse. Parse errors are deterministic for a given response.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Http { .. } | Self::Upstream(_)
        )
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }

    /// HTTP status tied to this failure, when one exists.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } => Some(*status),
            Self::Blocked(BlockSignal::Status(status)) => Some(*status),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Abstraction over the parser endpoint, mockable in tests.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchSuccess, FetchError>;
}

/// Client for a parser endpoint speaking the `{"url": ...}` protocol.
pub struct ParserClient {
    client: Client,
    endpoint: String,
    rotate_agents: bool,
    detector: BlockDetector,
}

impl ParserClient {
    pub fn new(
        endpoint: &str,
        timeout: Duration,
        user_agent: Option<&str>,
        detector: BlockDetector,
    ) -> Self {
        let rotate_agents = matches!(user_agent, Some("rotate"));
        let client = Client::builder()
            .user_agent(resolve_user_agent(user_agent))
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            rotate_agents,
            detector,
        }
    }

    /// Verify the endpoint is reachable before starting a batch.
    ///
    /// A plain GET is enough; endpoints that only accept POST answer
    /// 405, which still proves something is listening.
    pub async fn preflight(&self) -> Result<u16, FetchError> {
        let response = self.client.get(&self.endpoint).send().await?;
        let status = response.status();
        if status.is_success() || status.as_u16() == 405 {
            Ok(status.as_u16())
        } else {
            Err(FetchError::Http {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl Fetch for ParserClient {
    async fn fetch(&self, url: &str) -> Result<FetchSuccess, FetchError> {
        let start = Instant::now();

        let mut request = self.client.post(&self.endpoint).json(&json!({ "url": url }));
        if self.rotate_agents {
            request = request.header(reqwest::header::USER_AGENT, user_agent::random_user_agent());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let response_time = start.elapsed();

        debug!(
            "Endpoint answered {} for {} in {}ms",
            status.as_u16(),
            url,
            response_time.as_millis()
        );

        if let Some(signal) = self.detector.detect(status.as_u16(), &body) {
            warn!("Block signal for {}: {}", url, signal);
            return Err(FetchError::Blocked(signal));
        }

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let reply: ParseReply = serde_json::from_str(&body)?;

        if let Some(message) = reply.error {
            if let Some(upstream_status) = reply.status {
                debug!("Upstream status for {} was {}", url, upstream_status);
            }
            return Err(FetchError::Upstream(message));
        }

        Ok(FetchSuccess {
            data: reply.data.unwrap_or(serde_json::Value::Null),
            response_time,
        })
    }
}
