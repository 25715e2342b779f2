//! Environment-driven runtime settings.
//!
//! All knobs come from environment variables (a `.env` file is honored via
//! `dotenvy` in `main`). Unset or unparsable values fall back to defaults, so
//! a bare checkout runs with sensible behavior.

use std::str::FromStr;

use tracing::warn;

/// Runtime configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// First data-file line to process (1-indexed, inclusive).
    pub start_line: usize,
    /// Last data-file line to process (inclusive).
    pub end_line: usize,
    /// Shuffle profile processing order.
    pub random_start: bool,
    /// Maximum number of concurrently running account pipelines.
    pub thread_count: usize,
    /// Staggered-start delay range between task launches, whole seconds.
    pub account_delay: (u64, u64),
    /// Pacing delay range before every leave request, seconds.
    pub request_delay: (f64, f64),
    /// When non-empty, only these profile numbers run.
    pub allow_profiles: Vec<u32>,
    /// Profile numbers excluded from the run.
    pub skip_profiles: Vec<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_line: 1,
            end_line: 9999,
            random_start: false,
            thread_count: 3,
            account_delay: (1, 5),
            request_delay: (5.0, 10.0),
            allow_profiles: Vec::new(),
            skip_profiles: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            start_line: env_parse("START_LINE", defaults.start_line),
            end_line: env_parse("END_LINE", defaults.end_line),
            random_start: std::env::var("RANDOM_START")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(defaults.random_start),
            thread_count: env_parse("THREAD_COUNT", defaults.thread_count).max(1),
            account_delay: (
                env_parse("ACCOUNT_DELAY_MIN", defaults.account_delay.0),
                env_parse("ACCOUNT_DELAY_MAX", defaults.account_delay.1),
            ),
            request_delay: (
                env_parse("DISCORD_REQUEST_DELAY_MIN", defaults.request_delay.0),
                env_parse("DISCORD_REQUEST_DELAY_MAX", defaults.request_delay.1),
            ),
            allow_profiles: parse_number_list(
                &std::env::var("ALLOW_PROFILE_NUMBERS").unwrap_or_default(),
                "ALLOW_PROFILE_NUMBERS",
            ),
            skip_profiles: parse_number_list(
                &std::env::var("SKIP_PROFILE_NUMBERS").unwrap_or_default(),
                "SKIP_PROFILE_NUMBERS",
            ),
        }
    }

    /// Whether the given profile number passes the allow/skip filters.
    pub fn profile_selected(&self, number: u32) -> bool {
        if !self.allow_profiles.is_empty() && !self.allow_profiles.contains(&number) {
            return false;
        }
        !self.skip_profiles.contains(&number)
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a comma-separated profile-number list, skipping blanks and
/// '#'-prefixed entries. Unparsable entries are logged and dropped.
fn parse_number_list(raw: &str, key: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty() && !part.starts_with('#'))
        .filter_map(|part| match part.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!("Invalid profile number in {key}: {part}");
                None
            }
        })
        .collect()
}
