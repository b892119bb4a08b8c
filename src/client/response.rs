//! Parser endpoint response types.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

/// JSON body returned by the parser endpoint.
///
/// The endpoint replies `{"data": ..., "error": ..., "status": ...}`
/// where any field may be null or absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ParseReply {
    /// Extracted listing fields, shape defined by the endpoint.
    #[serde(default)]
    pub data: Option<Value>,
    /// Set when the endpoint fetched the page but failed to parse it.
    #[serde(default)]
    pub error: Option<String>,
    /// HTTP status the endpoint saw from the target site.
    #[serde(default)]
    pub status: Option<u16>,
}

/// A successful parse with client-side timing.
#[derive(Debug, Clone)]
pub struct FetchSuccess {
    pub data: Value,
    pub response_time: Duration,
}
