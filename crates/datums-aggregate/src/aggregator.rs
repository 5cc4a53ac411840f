//! Interval bucketing of raw trades into OHLCV bars.

use datums_types::{Interval, Trade, floor_to_interval};

use crate::{CSV_HEADER, Ohlcv};

/// Aggregates a chronologically ordered trade sequence into fixed-interval
/// OHLCV bars.
///
/// Only populated buckets produce bars; a gap spanning several empty
/// intervals yields no filler rows, so consecutive bars are not guaranteed
/// to be `interval` seconds apart. Gap detection is the validator's concern.
#[derive(Debug, Clone, Copy)]
pub struct TradeAggregator {
    interval: Interval,
}

impl TradeAggregator {
    /// Creates an aggregator for the given bar width.
    #[must_use]
    pub const fn new(interval: Interval) -> Self {
        Self { interval }
    }

    /// Returns the bar width being aggregated to.
    #[must_use]
    pub const fn interval(&self) -> Interval {
        self.interval
    }

    /// Computes one bar per non-empty bucket, in bucket order.
    ///
    /// A bucket boundary is crossed the moment a trade's floored timestamp
    /// differs from the current bucket start by at least one full interval.
    /// The final buffer is always flushed; an end-of-stream bucket is never
    /// empty when the input is non-empty.
    #[must_use]
    pub fn aggregate(&self, trades: &[Trade]) -> Vec<Ohlcv> {
        let interval = self.interval.seconds();
        let mut bars = Vec::new();
        let mut buffer: Vec<Trade> = Vec::new();
        let mut bucket_start: Option<i64> = None;

        for trade in trades {
            let floored = floor_to_interval(trade.timestamp as i64, interval);
            let start = *bucket_start.get_or_insert(floored);
            if floored - start >= interval {
                bucket_start = Some(floored);
                if !buffer.is_empty() {
                    bars.push(self.make_bar(&buffer));
                    buffer.clear();
                }
            }
            buffer.push(*trade);
        }

        if !buffer.is_empty() {
            bars.push(self.make_bar(&buffer));
        }
        bars
    }

    /// Renders the aggregation as CSV text: the header line followed by one
    /// row per bar, no trailing newline. Empty input yields the header only.
    #[must_use]
    pub fn to_csv(&self, trades: &[Trade]) -> String {
        let mut csv = String::from(CSV_HEADER);
        for bar in self.aggregate(trades) {
            csv.push('\n');
            csv.push_str(&bar.csv_line());
        }
        csv
    }

    /// Collapses one non-empty bucket buffer into a bar.
    ///
    /// A bucket whose trades carry no volume has no weightable prices; its
    /// vwap falls back to the close price so the CSV stays numeric.
    fn make_bar(&self, trades: &[Trade]) -> Ohlcv {
        let mut open = 0.0;
        let mut close = 0.0;
        let mut high = f64::NEG_INFINITY;
        let mut low = f64::INFINITY;
        let mut total_volume = 0.0;
        let mut weighted = 0.0;
        let mut min_ts = i64::MAX;

        for (i, trade) in trades.iter().enumerate() {
            if i == 0 {
                open = trade.price;
            }
            close = trade.price;
            high = high.max(trade.price);
            low = low.min(trade.price);
            total_volume += trade.volume;
            weighted += trade.price * trade.volume;
            min_ts = min_ts.min(trade.timestamp as i64);
        }

        let vwap = if total_volume > 0.0 {
            weighted / total_volume
        } else {
            close
        };

        Ohlcv::new(
            floor_to_interval(min_ts, self.interval.seconds()),
            open,
            high,
            low,
            close,
            truncate(vwap, 1),
            round_to(total_volume, 8),
            trades.len() as u64,
        )
    }
}

/// Truncates `x` toward zero at `digits` decimal places (decimal shift and
/// integer truncation, not rounding).
fn truncate(x: f64, digits: i32) -> f64 {
    let shift = 10f64.powi(digits);
    (x * shift).trunc() / shift
}

/// Rounds `x` to `digits` decimal places.
fn round_to(x: f64, digits: i32) -> f64 {
    let shift = 10f64.powi(digits);
    (x * shift).round() / shift
}
