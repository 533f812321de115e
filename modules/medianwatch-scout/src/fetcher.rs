//! Chrome-backed page fetcher.
//!
//! Headless Chromium `--dump-dom` renders the JS-heavy suburb pages, then a
//! Readability pass strips the chrome down to article text. The fetcher owns
//! the per-fetch timeout and retries of transient launch failures; suburb
//! sequencing and pacing stay with the orchestrator.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tracing::{info, warn};

use medianwatch_common::{Config, MedianWatchError, SuburbPage};

use crate::sources;
use crate::traits::StatsPageFetcher;

/// Max retry attempts for transient Chrome failures (e.g. "Cannot fork").
const CHROME_MAX_ATTEMPTS: u32 = 3;
/// Base backoff duration for Chrome retries. Actual delay is base * 3^attempt + jitter.
const CHROME_RETRY_BASE: Duration = Duration::from_secs(3);

pub struct ChromeFetcher {
    chrome_bin: String,
    base_url: String,
    timeout: Duration,
}

impl ChromeFetcher {
    pub fn new(config: &Config) -> Self {
        info!(
            chrome_bin = %config.chrome_bin,
            "Using ChromeFetcher (dump-dom + readability extraction)"
        );
        Self {
            chrome_bin: config.chrome_bin.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// Launch Chrome `--dump-dom` and return raw stdout bytes. Retries up to
    /// CHROME_MAX_ATTEMPTS on transient fork/launch failures with
    /// exponential backoff plus random jitter.
    async fn run_chrome(&self, url: &str) -> Result<Vec<u8>, MedianWatchError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| MedianWatchError::Fetch(format!("invalid url {url}: {e}")))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(MedianWatchError::Fetch(format!(
                "only http/https URLs are allowed, got: {}",
                parsed.scheme()
            )));
        }

        for attempt in 0..CHROME_MAX_ATTEMPTS {
            let tmp_dir = tempfile::tempdir().map_err(|e| {
                MedianWatchError::Session(format!("failed to create temp profile dir: {e}"))
            })?;

            let result = tokio::time::timeout(
                self.timeout,
                tokio::process::Command::new(&self.chrome_bin)
                    .args([
                        "--headless",
                        "--no-sandbox",
                        "--disable-gpu",
                        "--disable-dev-shm-usage",
                        "--disable-blink-features=AutomationControlled",
                        &format!("--user-data-dir={}", tmp_dir.path().display()),
                        "--dump-dom",
                        url,
                    ])
                    .output(),
            )
            .await;

            match result {
                Ok(Ok(output)) => {
                    if output.status.success() {
                        if output.stdout.is_empty() && attempt + 1 < CHROME_MAX_ATTEMPTS {
                            self.backoff(url, attempt, "Chrome returned empty DOM").await;
                            continue;
                        }
                        return Ok(output.stdout);
                    }
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    // Transient fork/resource exhaustion — retry
                    if is_transient(&stderr) && attempt + 1 < CHROME_MAX_ATTEMPTS {
                        self.backoff(url, attempt, "Chrome cannot fork").await;
                        continue;
                    }
                    warn!(url, fetcher = "chrome", stderr = %stderr, "Chrome exited with error");
                    return Err(MedianWatchError::Fetch(format!(
                        "chrome exited with {}: {}",
                        output.status,
                        stderr.trim()
                    )));
                }
                Ok(Err(e)) => {
                    let msg = e.to_string();
                    if is_transient(&msg) && attempt + 1 < CHROME_MAX_ATTEMPTS {
                        self.backoff(url, attempt, "Chrome launch failed").await;
                        continue;
                    }
                    // Could not start the browser at all — the shared
                    // resource is gone, not just this suburb.
                    return Err(MedianWatchError::Session(format!(
                        "failed to launch {}: {e}",
                        self.chrome_bin
                    )));
                }
                Err(_) => {
                    if attempt + 1 < CHROME_MAX_ATTEMPTS {
                        self.backoff(url, attempt, "Chrome timed out").await;
                        continue;
                    }
                    return Err(MedianWatchError::Fetch(format!(
                        "chrome timed out after {}s for {url}",
                        self.timeout.as_secs()
                    )));
                }
            }
        }

        Err(MedianWatchError::Fetch(format!(
            "chrome produced no DOM for {url} after {CHROME_MAX_ATTEMPTS} attempts"
        )))
    }

    async fn backoff(&self, url: &str, attempt: u32, reason: &str) {
        let backoff = CHROME_RETRY_BASE * 3u32.pow(attempt);
        let jitter = Duration::from_millis(rand::rng().random_range(0..1000));
        warn!(
            url,
            attempt = attempt + 1,
            backoff_secs = backoff.as_secs(),
            "{reason}, retrying after backoff"
        );
        tokio::time::sleep(backoff + jitter).await;
    }
}

fn is_transient(message: &str) -> bool {
    message.contains("Cannot fork") || message.contains("Resource temporarily unavailable")
}

/// Carve the page text into the blobs extraction tries in order: the stats
/// paragraph (property count + median value), the value paragraph, the rent
/// paragraph, and the full text as the last resort.
fn carve_blobs(text: String) -> SuburbPage {
    let mut stats_text = None;
    let mut value_text = None;
    let mut rent_text = None;

    for block in text.split("\n\n") {
        let lower = block.to_lowercase();
        if stats_text.is_none() && lower.contains("properties") && lower.contains("median value") {
            stats_text = Some(block.trim().to_string());
        }
        if value_text.is_none() && lower.contains("median value") && block.contains('$') {
            value_text = Some(block.trim().to_string());
        }
        if rent_text.is_none() && lower.contains("median rent") {
            rent_text = Some(block.trim().to_string());
        }
    }

    SuburbPage {
        stats_text,
        value_text,
        rent_text,
        full_text: text,
    }
}

#[async_trait]
impl StatsPageFetcher for ChromeFetcher {
    async fn stats_page(&self, slug: &str) -> Result<SuburbPage, MedianWatchError> {
        let url = sources::suburb_url(&self.base_url, slug);
        info!(url = %url, fetcher = "chrome", "Fetching suburb page");

        let html = self.run_chrome(&url).await?;
        if html.is_empty() {
            return Err(MedianWatchError::Fetch(format!("empty DOM output for {url}")));
        }

        let parsed_url = url::Url::parse(&url).ok();
        let config = TransformConfig {
            readability: true,
            main_content: true,
            return_format: ReturnFormat::Markdown,
            filter_images: true,
            filter_svg: true,
            clean_html: true,
        };
        let input = TransformInput {
            url: parsed_url.as_ref(),
            content: &html,
            screenshot_bytes: None,
            encoding: None,
            selector_config: None,
            ignore_tags: None,
        };

        let text = transform_content_input(input, &config);

        if text.trim().is_empty() {
            return Err(MedianWatchError::Fetch(format!(
                "empty content after readability extraction for {url}"
            )));
        }

        info!(url = %url, fetcher = "chrome", chars = text.len(), "Fetched successfully");
        Ok(carve_blobs(text))
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carve_finds_each_blob_once() {
        let text = "Suburb insights\n\n\
                    There are 9,239 properties in Box Hill 3128 and the median value is high.\n\n\
                    The median value for Houses in Box Hill 3128 is $1,200,000 and for Units is $600,000.\n\n\
                    Houses have a median rent of $550 per week.\n\n\
                    Footer links"
            .to_string();
        let page = carve_blobs(text);

        assert!(page.stats_text.as_deref().unwrap().contains("9,239 properties"));
        assert!(page.value_text.as_deref().unwrap().contains("$1,200,000"));
        assert!(page.rent_text.as_deref().unwrap().contains("median rent"));
        assert!(page.full_text.contains("Footer links"));
    }

    #[test]
    fn carve_without_matches_keeps_only_full_text() {
        let page = carve_blobs("Nothing relevant here".to_string());
        assert_eq!(page.stats_text, None);
        assert_eq!(page.value_text, None);
        assert_eq!(page.rent_text, None);
        assert_eq!(page.full_text, "Nothing relevant here");
    }
}
