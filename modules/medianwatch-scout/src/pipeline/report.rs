//! Incremental report store — an append-only markdown table keyed by
//! (period, suburb).
//!
//! The file is the durable dataset: one header block written at creation,
//! then two rows (house, unit) per stored observation, never rewritten or
//! reordered. Loading re-parses the rows into the in-memory key set, so the
//! persisted form is the source of truth across runs.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use tracing::info;

use medianwatch_common::{DedupKey, MarketRecord, MedianWatchError, PropertyKind, ReportPeriod};

const REPORT_TITLE: &str = "# Melbourne Suburb Market Report";
const TABLE_HEADER: &str = "| Date | Suburb | Type | Value | 5yr Change | Weekly Rent | Yield |";
const TABLE_SEPARATOR: &str = "|------|--------|------|-------|------------|-------------|-------|";

pub struct MarketReport {
    path: PathBuf,
    keys: HashSet<DedupKey>,
}

impl MarketReport {
    /// Open the report at `path`, rebuilding the key set from any rows a
    /// previous run persisted. A missing file is an empty report; the
    /// header is written by the first append.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MedianWatchError> {
        let path = path.into();
        let mut keys = HashSet::new();
        if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            for key in parse_keys(&text) {
                keys.insert(key);
            }
            info!(path = %path.display(), observations = keys.len(), "Loaded existing report");
        }
        Ok(Self { path, keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True iff this observation is already stored — checked both before
    /// fetching (expected period) and after extraction (actual period).
    pub fn contains(&self, key: &DedupKey) -> bool {
        self.keys.contains(key)
    }

    /// Append one observation: both property rows in a single write, then
    /// the key. The key is only recorded once the write has succeeded, so
    /// the set never claims a row the file does not hold.
    pub fn append(&mut self, record: &MarketRecord) -> Result<(), MedianWatchError> {
        let key = record.key();
        if self.keys.contains(&key) {
            return Err(MedianWatchError::DuplicateKey {
                period: key.period,
                suburb: key.suburb,
            });
        }

        let mut block = String::new();
        if !self.path.exists() {
            block.push_str(&header_block());
        }
        block.push_str(&row(record, PropertyKind::House));
        block.push_str(&row(record, PropertyKind::Unit));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;

        self.keys.insert(key);
        Ok(())
    }
}

/// Rebuild dedup keys from persisted rows. Header and separator lines also
/// contain pipes, but their first cell is not a date, so they drop out of
/// the parse instead of needing to be counted and skipped.
fn parse_keys(text: &str) -> Vec<DedupKey> {
    text.lines()
        .filter(|line| line.contains('|'))
        .filter_map(|line| {
            let cells: Vec<&str> = line.split('|').map(str::trim).collect();
            // "| a | b | ... |" splits into ["", "a", "b", ..., ""]
            if cells.len() < 3 {
                return None;
            }
            let period = ReportPeriod::parse(cells[1])?;
            let suburb = cells[2];
            if suburb.is_empty() {
                return None;
            }
            Some(DedupKey {
                period,
                suburb: suburb.to_string(),
            })
        })
        .collect()
}

fn header_block() -> String {
    format!(
        "{REPORT_TITLE}\n\nGenerated: {}\n\n{TABLE_HEADER}\n{TABLE_SEPARATOR}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    )
}

fn row(record: &MarketRecord, kind: PropertyKind) -> String {
    let rent = match record.rent(kind) {
        Some(rent) => format!("${rent:.0}"),
        None => "-".to_string(),
    };
    format!(
        "| {} | {} | {} | ${} | {}% | {} | {} |\n",
        record.period,
        record.suburb,
        kind,
        format_thousands(record.value(kind)),
        record.change(kind),
        rent,
        record.rental_yield(kind),
    )
}

/// Whole-dollar rendering with thousands separators, matching the site's
/// own formatting of the values.
fn format_thousands(value: f64) -> String {
    let whole = value.round() as i64;
    let digits = whole.abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if whole < 0 {
        format!("-{out}")
    } else {
        out
    }
}
