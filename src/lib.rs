//! listharvest - polite batch harvester for a listings parser endpoint.
//!
//! Feeds a newline-delimited list of listing URLs through a local HTTP
//! parser endpoint one request at a time, with randomized delays between
//! requests, exponential-backoff retries, block/CAPTCHA detection and
//! periodic JSON snapshots of the accumulated results.

pub mod block;
pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod rate_limit;
pub mod report;
pub mod runner;
pub mod urlfile;
