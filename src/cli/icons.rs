//! Status glyphs for terminal output.

#![allow(dead_code)]

use console::{style, StyledObject};

pub fn success() -> StyledObject<&'static str> {
    style("✓").green().bold()
}

pub fn error() -> StyledObject<&'static str> {
    style("✗").red().bold()
}

pub fn warn() -> StyledObject<&'static str> {
    style("!").yellow().bold()
}

pub fn info() -> StyledObject<&'static str> {
    style("ℹ").blue()
}

pub fn arrow() -> StyledObject<&'static str> {
    style("→").dim()
}

pub fn bullet() -> StyledObject<&'static str> {
    style("•").dim()
}
