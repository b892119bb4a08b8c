//! Core data types for batch runs.

mod record;
mod task;

pub use record::{FetchFailure, FetchRecord, RunStats, RunStatus};
pub use task::FetchTask;
