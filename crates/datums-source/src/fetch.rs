//! Incremental trade acquisition with local caching and pacing.

use datums_cache::TradesCache;
use datums_types::Trade;
use std::path::Path;
use std::time::Duration;

use crate::api::{LEDGER_FREQUENCY, TradesApi};
use crate::Result;

/// File name of the block cache inside a pair's cache directory.
const CACHE_FILE_NAME: &str = "kraken_cache";

/// Pages through the remote trades endpoint, merging every page into the
/// local cache before requesting the next one.
///
/// The cache's high-water mark doubles as the pagination cursor, so an
/// interrupted run resumes where the last committed page ended. The cache
/// performs no deduplication; the remote pagination contract of
/// non-overlapping `since` cursors is what keeps trades unique.
#[derive(Debug)]
pub struct KrakenTrades<A> {
    api: A,
    cache: TradesCache,
    pair: String,
    max_results: usize,
    pacing: Duration,
}

impl<A: TradesApi> KrakenTrades<A> {
    /// Creates a fetcher for `pair`, caching under
    /// `<cache_dir>/<pair>/kraken_cache`.
    pub fn new(api: A, cache_dir: impl AsRef<Path>, pair: &str, max_results: usize) -> Self {
        let cache = TradesCache::new(cache_dir.as_ref().join(pair).join(CACHE_FILE_NAME));
        Self {
            api,
            cache,
            pair: pair.to_string(),
            max_results,
            pacing: LEDGER_FREQUENCY,
        }
    }

    /// Overrides the pacing delay between remote calls. Tests use this to
    /// avoid real sleeps.
    #[must_use]
    pub const fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Overrides the per-call result cap.
    #[must_use]
    pub const fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Returns the remote API handle.
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Fetches trades between the nanosecond bounds `since` and `until`.
    ///
    /// Remote pages are requested until the cache's high-water mark reaches
    /// `until` or the page total reaches the result cap, whichever comes
    /// first. The cap is a soft stop checked after each page, so the final
    /// page is always merged whole. Every remote call is preceded by the
    /// pacing sleep, the first one included.
    ///
    /// The returned trades are re-read from the durable cache rather than
    /// assembled in memory, so repeated calls with the same bounds are
    /// idempotent.
    ///
    /// # Errors
    ///
    /// Propagates remote format/response errors and cache failures. Pages
    /// merged before the failure remain committed.
    pub async fn get(&self, since: i64, until: i64) -> Result<Vec<Trade>> {
        let mut fetched = 0;
        while self.cache.last_timestamp()? < until && fetched < self.max_results {
            tokio::time::sleep(self.pacing).await;
            let cursor = match self.cache.last_timestamp()? {
                0 => since,
                mark => mark,
            };
            let page = self.api.recent_trades(&self.pair, cursor).await?;
            self.cache.update(&page.trades, page.last)?;
            fetched += page.trades.len();
            tracing::info!(pair = %self.pair, total = fetched, "received trades");
        }

        Ok(self.cache.get(as_seconds(since), as_seconds(until))?)
    }
}

/// Converts a nanosecond bound to the cache's second-based trade unit.
fn as_seconds(ns: i64) -> f64 {
    ns as f64 / 1e9
}
