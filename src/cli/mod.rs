//! Command-line interface.

pub mod commands;
pub mod icons;
pub mod progress;

pub use commands::{is_verbose, run};
