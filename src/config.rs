//! Configuration management for listharvest.
//!
//! Settings come from three layers: compiled-in defaults, an optional
//! TOML config file, and per-invocation CLI overrides applied by the
//! command handlers. Paths in the config file resolve relative to the
//! file itself so a project directory stays self-contained.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Config file name searched for in the working directory.
pub const CONFIG_FILENAME: &str = "listharvest.toml";

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/parse";
pub const DEFAULT_URLS_FILE: &str = "urls.txt";
pub const DEFAULT_OUTPUT_DIR: &str = "parsed-data";
pub const DEFAULT_STATE_DIR: &str = "logs";
pub const DEFAULT_DELAY_MIN_MS: u64 = 30_000;
pub const DEFAULT_DELAY_MAX_MS: u64 = 60_000;
pub const DEFAULT_MAX_REQUESTS: usize = 100;
pub const DEFAULT_FLUSH_EVERY: usize = 10;
pub const DEFAULT_MAX_FAILURES: usize = 5;
pub const DEFAULT_RETRY_BUDGET: u32 = 3;
pub const DEFAULT_RETRY_BASE_MS: u64 = 1_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid delay bounds: min {min}ms exceeds max {max}ms")]
    DelayBounds { min: u64, max: u64 },

    #[error("Flush interval must be at least 1")]
    FlushInterval,

    #[error("Invalid endpoint URL {url}: {source}")]
    Endpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Pacing presets trading throughput against detection risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Long delays, small daily budget.
    Safe,
    /// Balanced delays and budget.
    Moderate,
    /// Short delays, large budget. Expect blocks.
    Aggressive,
}

impl RunMode {
    /// Inter-request delay bounds for this preset, in milliseconds.
    pub fn delay_bounds_ms(&self) -> (u64, u64) {
        match self {
            Self::Safe => (5_000, 10_000),
            Self::Moderate => (3_000, 7_000),
            Self::Aggressive => (1_000, 3_000),
        }
    }

    /// Daily request budget for this preset.
    pub fn daily_limit(&self) -> u64 {
        match self {
            Self::Safe => 100,
            Self::Moderate => 500,
            Self::Aggressive => 2_000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Parser endpoint that receives `POST {"url": ...}`.
    pub endpoint: String,
    /// File with one URL per line.
    pub urls_file: PathBuf,
    /// Directory receiving result/error/stats snapshots.
    pub output_dir: PathBuf,
    /// Directory holding the request log and counters.
    pub state_dir: PathBuf,
    /// `None` for the default agent, `"rotate"` for per-request rotation,
    /// anything else is sent verbatim.
    pub user_agent: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout: u64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    /// Default cap on URLs per run. 0 means unlimited.
    pub max_requests: usize,
    /// Snapshot files are written every this many completed requests.
    pub flush_every: usize,
    /// Run aborts once failures exceed this count.
    pub max_failures: usize,
    /// Retries per URL after the first attempt.
    pub retry_budget: u32,
    /// Base backoff delay, doubled per retry.
    pub retry_base_ms: u64,
    /// Extra block-page markers on top of the built-in set.
    pub block_signatures: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            urls_file: PathBuf::from(DEFAULT_URLS_FILE),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            user_agent: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_SECS,
            delay_min_ms: DEFAULT_DELAY_MIN_MS,
            delay_max_ms: DEFAULT_DELAY_MAX_MS,
            max_requests: DEFAULT_MAX_REQUESTS,
            flush_every: DEFAULT_FLUSH_EVERY,
            max_failures: DEFAULT_MAX_FAILURES,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_base_ms: DEFAULT_RETRY_BASE_MS,
            block_signatures: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply a pacing preset's delay bounds.
    pub fn apply_mode(&mut self, mode: RunMode) {
        let (min, max) = mode.delay_bounds_ms();
        self.delay_min_ms = min;
        self.delay_max_ms = max;
    }

    /// Validate cross-field constraints before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay_min_ms > self.delay_max_ms {
            return Err(ConfigError::DelayBounds {
                min: self.delay_min_ms,
                max: self.delay_max_ms,
            });
        }
        if self.flush_every == 0 {
            return Err(ConfigError::FlushInterval);
        }
        Url::parse(&self.endpoint).map_err(|source| ConfigError::Endpoint {
            url: self.endpoint.clone(),
            source,
        })?;
        Ok(())
    }

    /// Create the output and state directories if missing.
    pub fn ensure_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create output directory {}: {}",
                    self.output_dir.display(),
                    e
                ),
            )
        })?;
        std::fs::create_dir_all(&self.state_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create state directory {}: {}",
                    self.state_dir.display(),
                    e
                ),
            )
        })?;
        Ok(())
    }
}

/// On-disk config file shape. Every field is optional; missing fields
/// keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_min_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_max_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_requests: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_every: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_failures: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_budget: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_base_ms: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub block_signatures: Vec<String>,

    /// Where this config was loaded from. Not part of the file format.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load and parse a config file.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        let mut config: Config =
            toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Directory that relative paths in this config resolve against.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Overlay this config's fields onto `settings`.
    pub fn apply_to_settings(&self, settings: &mut Settings) {
        let base = self.base_dir();

        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(urls_file) = &self.urls_file {
            settings.urls_file = resolve_path(urls_file, &base);
        }
        if let Some(output_dir) = &self.output_dir {
            settings.output_dir = resolve_path(output_dir, &base);
        }
        if let Some(state_dir) = &self.state_dir {
            settings.state_dir = resolve_path(state_dir, &base);
        }
        if let Some(user_agent) = &self.user_agent {
            settings.user_agent = Some(user_agent.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(min) = self.delay_min_ms {
            settings.delay_min_ms = min;
        }
        if let Some(max) = self.delay_max_ms {
            settings.delay_max_ms = max;
        }
        if let Some(max_requests) = self.max_requests {
            settings.max_requests = max_requests;
        }
        if let Some(flush_every) = self.flush_every {
            settings.flush_every = flush_every;
        }
        if let Some(max_failures) = self.max_failures {
            settings.max_failures = max_failures;
        }
        if let Some(budget) = self.retry_budget {
            settings.retry_budget = budget;
        }
        if let Some(base_ms) = self.retry_base_ms {
            settings.retry_base_ms = base_ms;
        }
        if !self.block_signatures.is_empty() {
            settings.block_signatures = self.block_signatures.clone();
        }
    }
}

/// Expand `~` and resolve relative paths against `base`.
fn resolve_path(raw: &str, base: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(raw);
    let path = PathBuf::from(expanded.as_ref());
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Find the config file to load, if any.
///
/// Order: explicit `--config` path, then `./listharvest.toml`, then the
/// per-user config directory.
fn discover_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user = config_dir.join("listharvest").join("config.toml");
        if user.exists() {
            return Some(user);
        }
    }

    None
}

/// Build runtime settings from defaults plus any discovered config file.
///
/// A missing config file is fine; a discovered file that fails to read
/// or parse is an error so typos do not silently fall back to defaults.
pub async fn load_settings(config_path: Option<PathBuf>) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    if let Some(path) = discover_config(config_path.as_deref()) {
        let config = Config::load_from_path(&path).await?;
        debug!("Loaded config from {}", path.display());
        config.apply_to_settings(&mut settings);
    }

    Ok(settings)
}
