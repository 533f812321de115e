use thiserror::Error;

use crate::types::ReportPeriod;

#[derive(Error, Debug)]
pub enum MedianWatchError {
    /// A required numeric field was not found by any extraction strategy.
    /// Per-suburb, non-fatal: the suburb is counted as failed and skipped.
    #[error("required field could not be extracted: {0}")]
    MissingField(&'static str),

    /// The collaborator could not retrieve content for one suburb.
    /// Per-suburb, non-fatal.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// An append was attempted for a key the report already holds. The
    /// orchestrator filters before appending, so this indicates a logic
    /// error and is surfaced loudly rather than swallowed.
    #[error("duplicate report key: {period} / {suburb}")]
    DuplicateKey { period: ReportPeriod, suburb: String },

    /// The shared browser resource is unusable. Fatal to the current
    /// session; triggers bounded session-level retry.
    #[error("browser session failure: {0}")]
    Session(String),

    #[error("report store error: {0}")]
    Report(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
