//! Query orchestration: fetch, aggregate, validate.

use datums_aggregate::TradeAggregator;
use datums_types::{CsvDatums, Interval, floor_to_interval, to_nano_sec};
use datums_validate::validate;
use std::path::Path;
use std::time::Duration;

use crate::Result;
use crate::fetch::KrakenTrades;
use crate::api::TradesApi;

/// Default hard cap on trades retrieved in one query call.
const DEFAULT_MAX_RESULTS: usize = 1_000_000;

/// One pair's end-to-end query pipeline: paced fetching through the cache,
/// aggregation into bars, and a best-effort validation pass.
#[derive(Debug)]
pub struct KrakenSource<A> {
    trades: KrakenTrades<A>,
    aggregator: TradeAggregator,
}

impl<A: TradesApi> KrakenSource<A> {
    /// Creates a source for `pair`, caching trades under
    /// `<storage>/<pair>/`.
    pub fn new(api: A, storage: impl AsRef<Path>, pair: &str, interval: Interval) -> Self {
        Self {
            trades: KrakenTrades::new(api, storage, pair, DEFAULT_MAX_RESULTS),
            aggregator: TradeAggregator::new(interval),
        }
    }

    /// Overrides the per-call result cap.
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.trades = self.trades.with_max_results(max_results);
        self
    }

    /// Overrides the pacing delay between remote calls.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.trades = self.trades.with_pacing(pacing);
        self
    }

    /// Fetches all trades from `since` (epoch seconds) up to the last
    /// completed interval and aggregates them into CSV datums.
    ///
    /// The catch-up ceiling is the remote server's clock floored to the
    /// interval, so the currently open bucket is never requested. A
    /// validation failure does not fail the query: it is logged as a
    /// warning and the datums are returned as-is, leaving the decision to
    /// downstream consumers.
    ///
    /// # Errors
    ///
    /// Propagates remote format/response errors and cache failures.
    pub async fn query(
        &self,
        since: i64,
        exclude_outliers: Option<&[String]>,
        z_score_threshold: f64,
    ) -> Result<CsvDatums> {
        let interval = self.aggregator.interval();
        let now = self.trades.api().server_time().await?;
        let until = to_nano_sec(floor_to_interval(now, interval.seconds()));

        let trades = self.trades.get(to_nano_sec(since), until).await?;
        let datums = CsvDatums::new(interval, self.aggregator.to_csv(&trades));
        if let Err(e) = validate(&datums, exclude_outliers, z_score_threshold) {
            tracing::warn!(error = %e, "invalid data found");
        }
        Ok(datums)
    }
}
