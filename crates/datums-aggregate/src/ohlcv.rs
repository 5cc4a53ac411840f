//! OHLCV (candlestick) data structure and CSV rendering.

use serde::{Deserialize, Serialize};

/// Header line of the CSV interchange format.
pub const CSV_HEADER: &str = "timestamp,open,high,low,close,vwap,volume,count";

/// One OHLCV bar for one interval bucket.
///
/// Bars are derived data: they are recomputed from trades on every
/// aggregation call and never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    /// Bucket start, seconds since the epoch, aligned to the interval.
    pub timestamp: i64,
    /// Price of the first trade in the bucket.
    pub open: f64,
    /// Highest trade price in the bucket.
    pub high: f64,
    /// Lowest trade price in the bucket.
    pub low: f64,
    /// Price of the last trade in the bucket.
    pub close: f64,
    /// Volume-weighted average price, truncated to 1 decimal place.
    pub vwap: f64,
    /// Total traded volume, rounded to 8 decimal places.
    pub volume: f64,
    /// Number of trades in the bucket.
    pub trade_count: u64,
}

impl Ohlcv {
    /// Creates a new OHLCV bar.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        vwap: f64,
        volume: f64,
        trade_count: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            vwap,
            volume,
            trade_count,
        }
    }

    /// Renders the bar as one CSV row, matching [`CSV_HEADER`].
    #[must_use]
    pub fn csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{}",
            self.timestamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.vwap,
            self.volume,
            self.trade_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_line() {
        let bar = Ohlcv::new(1_500_000_000, 10.0, 12.5, 9.5, 11.0, 10.4, 0.625, 4);
        assert_eq!(bar.csv_line(), "1500000000,10,12.5,9.5,11,10.4,0.625,4");
    }
}
