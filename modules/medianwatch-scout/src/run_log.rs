//! Scout run log — persisted JSON timeline of every action taken during a
//! run.
//!
//! Each run produces a single `{data_dir}/scout-runs/{run_id}.json` file
//! containing an ordered list of events with timestamps, plus the final
//! stats. The report answers "what is the state"; the run log answers "what
//! did the scout do to get there".

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use medianwatch_common::MedianWatchError;

use crate::scout::ScoutStats;

pub struct RunLog {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    events: Vec<RunEvent>,
    seq: u32,
}

#[derive(Serialize)]
struct RunEvent {
    seq: u32,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    kind: EventKind,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted {
        attempt: u32,
        suburbs: u32,
    },
    SuburbSkipped {
        suburb: String,
        period: String,
        /// True when the expected key matched and no fetch happened; false
        /// when the page's actual period turned out to be already stored.
        before_fetch: bool,
    },
    PageFetched {
        slug: String,
        content_chars: usize,
    },
    RecordStored {
        suburb: String,
        period: String,
        period_source: String,
        house_value: f64,
        unit_value: f64,
    },
    SuburbFailed {
        suburb: String,
        reason: String,
    },
    SessionFailed {
        attempt: u32,
        reason: String,
        backoff_secs: u64,
    },
    RunAborted {
        retries: u32,
    },
}

impl RunLog {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            events: Vec::new(),
            seq: 0,
        }
    }

    pub fn log(&mut self, kind: EventKind) {
        self.events.push(RunEvent {
            seq: self.seq,
            ts: Utc::now(),
            kind,
        });
        self.seq += 1;
    }

    /// Serialize the run log to JSON and write it under `data_dir`.
    /// Returns the file path on success.
    pub fn save(&self, stats: &ScoutStats, data_dir: &Path) -> Result<PathBuf, MedianWatchError> {
        let dir = data_dir.join("scout-runs");
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.json", self.run_id));

        let output = SerializedRunLog {
            run_id: &self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            stats,
            events: &self.events,
        };

        std::fs::write(
            &path,
            serde_json::to_string_pretty(&output)
                .map_err(|e| MedianWatchError::Report(format!("run log serialization: {e}")))?,
        )?;
        info!(path = %path.display(), events = self.events.len(), "Run log saved");

        Ok(path)
    }
}

#[derive(Serialize)]
struct SerializedRunLog<'a> {
    run_id: &'a str,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    stats: &'a ScoutStats,
    events: &'a [RunEvent],
}
