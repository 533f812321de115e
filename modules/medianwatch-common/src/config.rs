use std::env;
use std::path::PathBuf;

use tracing::info;

/// Application configuration loaded from environment variables. Every value
/// has a default — the scout runs out of the box against the public site.
#[derive(Debug, Clone)]
pub struct Config {
    /// Markdown report the store appends to.
    pub report_path: PathBuf,

    /// Root directory for run logs and other run artifacts.
    pub data_dir: PathBuf,

    /// Headless browser binary used by the fetcher.
    pub chrome_bin: String,

    /// Base URL the suburb slug is appended to.
    pub base_url: String,

    /// Per-suburb fetch timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Bound on session-level restarts after a browser failure.
    pub max_session_retries: u32,

    /// Fixed wait between session restarts, in seconds.
    pub session_backoff_secs: u64,

    /// Pacing band between fetched suburbs, in milliseconds.
    pub pace_min_ms: u64,
    pub pace_max_ms: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            report_path: PathBuf::from(env_or("REPORT_PATH", "suburb_report.md")),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
            chrome_bin: env_or("CHROME_BIN", "chromium"),
            base_url: env_or("SUBURB_BASE_URL", "https://www.onthehouse.com.au/suburb/vic"),
            fetch_timeout_secs: parsed_env_or("FETCH_TIMEOUT_SECS", 30),
            max_session_retries: parsed_env_or("MAX_SESSION_RETRIES", 3),
            session_backoff_secs: parsed_env_or("SESSION_BACKOFF_SECS", 10),
            pace_min_ms: parsed_env_or("PACE_MIN_MS", 1_000),
            pace_max_ms: parsed_env_or("PACE_MAX_MS", 6_000),
        }
    }

    pub fn log_summary(&self) {
        info!(
            report = %self.report_path.display(),
            data_dir = %self.data_dir.display(),
            base_url = %self.base_url,
            fetch_timeout_secs = self.fetch_timeout_secs,
            max_session_retries = self.max_session_retries,
            "Configuration loaded"
        );
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a number, got {raw:?}")),
        Err(_) => default,
    }
}
