//! User agent management for endpoint requests.

/// Default user agent identifying this tool honestly.
pub const USER_AGENT: &str = "listharvest/0.4 (listings batch research)";

/// Pool of real browser user agents for rotation mode.
pub const ROTATION_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    // Chrome on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    // Chrome on Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    // Firefox on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:127.0) Gecko/20100101 Firefox/127.0",
    // Safari on macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
];

/// Pick a random agent from the rotation pool.
pub fn random_user_agent() -> &'static str {
    ROTATION_USER_AGENTS[rand::random_range(0..ROTATION_USER_AGENTS.len())]
}

/// Resolve the configured user agent value.
///
/// - `None` uses the default listharvest agent
/// - `Some("rotate")` picks a random browser agent
/// - Any other value is used verbatim
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some("rotate") => random_user_agent().to_string(),
        Some(custom) => custom.to_string(),
    }
}
