//! Block and CAPTCHA detection for endpoint responses.
//!
//! A 403 or 429 status is always treated as a block. Otherwise the raw
//! body is scanned for known block-page markers. False negatives are
//! expected; this is a stop-loss, not a bypass.

use std::fmt;

/// Markers that identify a block or CAPTCHA page, matched case-insensitively.
pub const BLOCK_SIGNATURES: &[&str] = &[
    "Access Denied",
    "Доступ запрещен",
    "Too Many Requests",
    "captcha",
    "cf-browser-verification",
    "Слишком много запросов",
];

/// Status codes that indicate a block regardless of body content.
pub const BLOCK_STATUS_CODES: &[u16] = &[403, 429];

/// Why a response was classified as blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockSignal {
    /// Blocking HTTP status.
    Status(u16),
    /// Body matched a known block-page marker.
    Signature(String),
}

impl fmt::Display for BlockSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {}", status),
            Self::Signature(marker) => write!(f, "body matched \"{}\"", marker),
        }
    }
}

/// Classifies endpoint responses as blocked or clean.
#[derive(Debug, Clone, Default)]
pub struct BlockDetector {
    extra_signatures: Vec<String>,
}

impl BlockDetector {
    /// Detector with the built-in marker set only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with additional markers on top of the built-in set.
    pub fn with_signatures(extra_signatures: Vec<String>) -> Self {
        Self { extra_signatures }
    }

    /// Classify a response. Status codes win over body content.
    pub fn detect(&self, status: u16, body: &str) -> Option<BlockSignal> {
        if BLOCK_STATUS_CODES.contains(&status) {
            return Some(BlockSignal::Status(status));
        }

        let haystack = body.to_lowercase();
        self.signatures()
            .find(|marker| haystack.contains(&marker.to_lowercase()))
            .map(|marker| BlockSignal::Signature(marker.to_string()))
    }

    /// True when the response looks blocked.
    pub fn is_blocked(&self, status: u16, body: &str) -> bool {
        self.detect(status, body).is_some()
    }

    fn signatures(&self) -> impl Iterator<Item = &str> + '_ {
        BLOCK_SIGNATURES
            .iter()
            .copied()
            .chain(self.extra_signatures.iter().map(|s| s.as_str()))
    }
}
