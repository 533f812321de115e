// Test mocks for the scout pipeline.
//
// MockFetcher implements the one trait boundary (StatsPageFetcher) from a
// slug→page map and records every call, so orchestrator tests can assert
// which suburbs were actually fetched. BrokenSessionFetcher fails every call
// at session level for retry/abort tests. The fixture builders phrase page
// text the way the live site does, so extraction tests exercise the real
// templates.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use medianwatch_common::{Config, MedianWatchError, SuburbPage};

use crate::traits::StatsPageFetcher;

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// HashMap-based page fetcher. Returns a `Fetch` error for unregistered
/// slugs. Builder pattern: `.on_page()`.
pub struct MockFetcher {
    pages: HashMap<String, SuburbPage>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn on_page(mut self, slug: &str, page: SuburbPage) -> Self {
        self.pages.insert(slug.to_string(), page);
        self
    }

    /// Slugs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatsPageFetcher for MockFetcher {
    async fn stats_page(&self, slug: &str) -> Result<SuburbPage, MedianWatchError> {
        self.calls.lock().unwrap().push(slug.to_string());
        self.pages
            .get(slug)
            .cloned()
            .ok_or_else(|| MedianWatchError::Fetch(format!("no page registered for {slug}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// BrokenSessionFetcher
// ---------------------------------------------------------------------------

/// Fetcher whose browser is permanently unusable: every call is a session
/// failure. Counts calls so tests can assert the retry bound.
pub struct BrokenSessionFetcher {
    calls: Mutex<u32>,
}

impl BrokenSessionFetcher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl Default for BrokenSessionFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatsPageFetcher for BrokenSessionFetcher {
    async fn stats_page(&self, _slug: &str) -> Result<SuburbPage, MedianWatchError> {
        *self.calls.lock().unwrap() += 1;
        Err(MedianWatchError::Session(
            "browser refused to start".to_string(),
        ))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

// ---------------------------------------------------------------------------
// Page fixtures
// ---------------------------------------------------------------------------

/// The statistics paragraph as the site phrases it. Changes are passed with
/// their direction keyword (e.g. `"5.3% decrease"`), values as formatted
/// amounts (e.g. `"1,200,000"`).
pub fn stats_blob(
    name: &str,
    house_change: &str,
    unit_change: &str,
    house_value: &str,
    unit_value: &str,
    as_at: Option<&str>,
) -> String {
    let mut blob = format!(
        "There are 9,239 properties in {name}. Houses in {name} have seen a {house_change} \
         in median value over the last 5 years, while Units have seen a {unit_change}. \
         The median value for Houses in {name} is ${house_value} and for Units is ${unit_value}."
    );
    if let Some(date) = as_at {
        blob.push_str(&format!(" As at {date}."));
    }
    blob
}

/// The median-rent paragraph as the site phrases it.
pub fn rent_blob(house_rent: &str, unit_rent: &str) -> String {
    format!(
        "Houses have a median rent of ${house_rent} per week, \
         while Units have a median rent of ${unit_rent} per week."
    )
}

/// Assemble a SuburbPage the way the Chrome fetcher carves a real page.
pub fn market_page(stats: &str, rent: Option<&str>) -> SuburbPage {
    let mut full = stats.to_string();
    if let Some(rent) = rent {
        full.push_str("\n\n");
        full.push_str(rent);
    }
    SuburbPage {
        stats_text: Some(stats.to_string()),
        value_text: Some(stats.to_string()),
        rent_text: rent.map(str::to_string),
        full_text: full,
    }
}

// ---------------------------------------------------------------------------
// Config fixture
// ---------------------------------------------------------------------------

/// Config for orchestrator tests: no pacing, no backoff waits, one retry.
pub fn test_config(report_path: &Path, data_dir: &Path) -> Config {
    Config {
        report_path: report_path.to_path_buf(),
        data_dir: data_dir.to_path_buf(),
        chrome_bin: "chromium".to_string(),
        base_url: "https://example.test/suburb/vic".to_string(),
        fetch_timeout_secs: 5,
        max_session_retries: 1,
        session_backoff_secs: 0,
        pace_min_ms: 0,
        pace_max_ms: 0,
    }
}
