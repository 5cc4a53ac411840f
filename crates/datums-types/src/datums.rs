//! Aggregated bar data in CSV interchange form.

use crate::Interval;
use serde::{Deserialize, Serialize};

/// Aggregated OHLCV bars for one interval, rendered as CSV text.
///
/// The CSV carries the header
/// `timestamp,open,high,low,close,vwap,volume,count` followed by one row per
/// non-empty bucket. This is the interchange format consumed by the
/// validator and the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvDatums {
    /// The bar width the CSV was aggregated to.
    pub interval: Interval,
    /// The CSV text, header included, without a trailing newline.
    pub csv: String,
}

impl CsvDatums {
    /// Creates a new datums value.
    #[must_use]
    pub const fn new(interval: Interval, csv: String) -> Self {
        Self { interval, csv }
    }
}
