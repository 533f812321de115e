//! Batch orchestrator — drives the per-suburb pipeline to completion.
//!
//! One fetcher session is shared across the whole list. Suburbs are
//! processed strictly in list order; each one either stores a record, skips
//! (already recorded), or fails in isolation. A session-level browser
//! failure aborts the pass and restarts the full list after a fixed backoff,
//! bounded by the retry limit — restarting from the top is intentional,
//! since already-stored suburbs short-circuit on the key check.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use tracing::{error, info, warn};

use medianwatch_common::{Config, DedupKey, MedianWatchError, Suburb};

use crate::pipeline::{extract, period, report::MarketReport};
use crate::run_log::{EventKind, RunLog};
use crate::traits::StatsPageFetcher;

/// Stats from a scout run.
#[derive(Debug, Default, Serialize)]
pub struct ScoutStats {
    pub suburbs_total: u32,
    pub pages_fetched: u32,
    pub stored: u32,
    pub skipped_existing: u32,
    pub failed: u32,
    pub session_retries: u32,
    pub aborted: bool,
}

impl std::fmt::Display for ScoutStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Market Scout Run Complete ===")?;
        writeln!(f, "Suburbs tracked:  {}", self.suburbs_total)?;
        writeln!(f, "Pages fetched:    {}", self.pages_fetched)?;
        writeln!(f, "Records stored:   {}", self.stored)?;
        writeln!(f, "Already recorded: {}", self.skipped_existing)?;
        writeln!(f, "Failed:           {}", self.failed)?;
        writeln!(f, "Session retries:  {}", self.session_retries)?;
        if self.aborted {
            writeln!(f, "Run aborted before completing the list.")?;
        }
        Ok(())
    }
}

/// What happened to one suburb this run. Per-suburb problems become a
/// `Failed` value here rather than escaping the loop.
enum SuburbOutcome {
    Stored(DedupKey),
    Skipped { key: DedupKey, before_fetch: bool },
    Failed(MedianWatchError),
}

pub struct Scout {
    fetcher: Arc<dyn StatsPageFetcher>,
    report: MarketReport,
    config: Config,
    suburbs: Vec<Suburb>,
}

impl Scout {
    pub fn new(
        fetcher: Arc<dyn StatsPageFetcher>,
        report: MarketReport,
        config: Config,
        suburbs: Vec<Suburb>,
    ) -> Self {
        Self {
            fetcher,
            report,
            config,
            suburbs,
        }
    }

    /// Run the batch to completion. Always returns a summary — an aborted
    /// run is reported, not panicked out of.
    pub async fn run(&mut self, run_log: &mut RunLog) -> ScoutStats {
        let mut stats = ScoutStats {
            suburbs_total: self.suburbs.len() as u32,
            ..ScoutStats::default()
        };

        let mut attempt = 0u32;
        loop {
            match self.run_session(attempt, &mut stats, run_log).await {
                Ok(()) => break,
                Err(e) => {
                    attempt += 1;
                    if attempt > self.config.max_session_retries {
                        error!(error = %e, retries = self.config.max_session_retries, "Session retries exhausted, aborting run");
                        run_log.log(EventKind::RunAborted {
                            retries: self.config.max_session_retries,
                        });
                        stats.aborted = true;
                        break;
                    }
                    stats.session_retries = attempt;
                    warn!(
                        error = %e,
                        attempt,
                        backoff_secs = self.config.session_backoff_secs,
                        "Session failed, restarting after backoff"
                    );
                    run_log.log(EventKind::SessionFailed {
                        attempt,
                        reason: e.to_string(),
                        backoff_secs: self.config.session_backoff_secs,
                    });
                    tokio::time::sleep(Duration::from_secs(self.config.session_backoff_secs))
                        .await;
                }
            }
        }

        stats
    }

    /// One pass over the full suburb list. Returns `Err` only for
    /// session-level failures; everything per-suburb is folded into stats.
    async fn run_session(
        &mut self,
        attempt: u32,
        stats: &mut ScoutStats,
        run_log: &mut RunLog,
    ) -> Result<(), MedianWatchError> {
        let suburbs = self.suburbs.clone();
        let total = suburbs.len();
        run_log.log(EventKind::SessionStarted {
            attempt,
            suburbs: total as u32,
        });
        info!(fetcher = self.fetcher.name(), suburbs = total, attempt, "Session started");

        let today = Utc::now().date_naive();

        for (index, suburb) in suburbs.iter().enumerate() {
            info!(suburb = %suburb.name, index = index + 1, total, "Processing suburb");

            // Cheap pre-fetch check: if the period we expect this month is
            // already recorded, the page is not worth a browser round-trip.
            let expected = DedupKey {
                period: period::fallback_period(today),
                suburb: suburb.name.clone(),
            };
            if self.report.contains(&expected) {
                info!(suburb = %suburb.name, period = %expected.period, "Already recorded, skipping fetch");
                stats.skipped_existing += 1;
                run_log.log(EventKind::SuburbSkipped {
                    suburb: suburb.name.clone(),
                    period: expected.period.to_string(),
                    before_fetch: true,
                });
                continue;
            }

            match self.process_suburb(suburb, today, stats, run_log).await? {
                SuburbOutcome::Stored(key) => {
                    info!(suburb = %suburb.name, period = %key.period, "Record stored");
                    stats.stored += 1;
                }
                SuburbOutcome::Skipped { key, before_fetch } => {
                    // The page's actual period differed from the expected
                    // one but is already stored — published late, usually.
                    info!(suburb = %suburb.name, period = %key.period, "Actual period already recorded");
                    stats.skipped_existing += 1;
                    run_log.log(EventKind::SuburbSkipped {
                        suburb: suburb.name.clone(),
                        period: key.period.to_string(),
                        before_fetch,
                    });
                }
                SuburbOutcome::Failed(e) => {
                    warn!(suburb = %suburb.name, error = %e, "Suburb failed, continuing");
                    stats.failed += 1;
                    run_log.log(EventKind::SuburbFailed {
                        suburb: suburb.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            self.pace().await;
        }

        Ok(())
    }

    /// Fetch, extract, resolve the period, and append one suburb. The outer
    /// `Err` is reserved for session failures; per-suburb problems come back
    /// as `SuburbOutcome::Failed`.
    async fn process_suburb(
        &mut self,
        suburb: &Suburb,
        today: chrono::NaiveDate,
        stats: &mut ScoutStats,
        run_log: &mut RunLog,
    ) -> Result<SuburbOutcome, MedianWatchError> {
        let page = match self.fetcher.stats_page(&suburb.slug).await {
            Ok(page) => page,
            Err(e @ MedianWatchError::Session(_)) => return Err(e),
            Err(e) => return Ok(SuburbOutcome::Failed(e)),
        };
        stats.pages_fetched += 1;
        run_log.log(EventKind::PageFetched {
            slug: suburb.slug.clone(),
            content_chars: page.full_text.len(),
        });

        let draft = match extract::extract_stats(&page) {
            Ok(draft) => draft,
            Err(e) => return Ok(SuburbOutcome::Failed(e)),
        };

        let (resolved, source) = period::resolve(&page, today);
        let record = draft.into_record(suburb.name.clone(), resolved, source);
        let key = record.key();

        if self.report.contains(&key) {
            return Ok(SuburbOutcome::Skipped {
                key,
                before_fetch: false,
            });
        }

        match self.report.append(&record) {
            Ok(()) => {
                run_log.log(EventKind::RecordStored {
                    suburb: record.suburb.clone(),
                    period: record.period.to_string(),
                    period_source: record.period_source.to_string(),
                    house_value: record.house_value,
                    unit_value: record.unit_value,
                });
                Ok(SuburbOutcome::Stored(key))
            }
            Err(e @ MedianWatchError::DuplicateKey { .. }) => {
                // The pre-append check makes this unreachable in normal
                // operation; if it fires, something upstream is wrong.
                error!(suburb = %suburb.name, error = %e, "Append hit a duplicate key past the skip check");
                Ok(SuburbOutcome::Failed(e))
            }
            Err(e) => Ok(SuburbOutcome::Failed(e)),
        }
    }

    /// Randomized delay between fetched suburbs, within the configured
    /// band. Skipped suburbs don't pace — nothing was requested.
    async fn pace(&self) {
        let (min, max) = (self.config.pace_min_ms, self.config.pace_max_ms);
        if max == 0 {
            return;
        }
        let max = max.max(min);
        let delay = Duration::from_millis(rand::rng().random_range(min..=max));
        tokio::time::sleep(delay).await;
    }
}
