// Trait abstraction for the browser-facing fetch boundary.
//
// StatsPageFetcher is the only seam between the pipeline and the outside
// world: the orchestrator asks for "the page text for this slug" and nothing
// else. Retry pacing and suburb sequencing stay in the orchestrator; the
// fetcher owns timeouts and transient browser retries.
//
// This enables deterministic testing with testing::MockFetcher — no browser,
// no network.

use async_trait::async_trait;

use medianwatch_common::{MedianWatchError, SuburbPage};

#[async_trait]
pub trait StatsPageFetcher: Send + Sync {
    /// Fetch the market statistics page for a suburb slug and carve it into
    /// text blobs for extraction.
    ///
    /// Errors distinguish scope: `Fetch` means this suburb failed and the
    /// batch should continue; `Session` means the shared browser resource is
    /// unusable and the whole pass must restart.
    async fn stats_page(&self, slug: &str) -> Result<SuburbPage, MedianWatchError>;

    fn name(&self) -> &str;
}
