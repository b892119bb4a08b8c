//! Progress bar for batch runs.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar tracking one URL batch.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("█▓░"),
        );
        bar.set_message("Fetching");
        Self { bar }
    }

    /// Show which URL is in flight.
    pub fn set_current(&self, text: &str) {
        self.bar.set_message(truncate_url(text, 50));
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    /// Print a line above the bar without disturbing it.
    pub fn println(&self, msg: &str) {
        self.bar.println(msg);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Keep the tail of long URLs; the path end identifies the listing.
fn truncate_url(url: &str, max_len: usize) -> String {
    let chars: Vec<char> = url.chars().collect();
    if chars.len() <= max_len {
        return url.to_string();
    }
    let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
    format!("...{}", tail)
}
