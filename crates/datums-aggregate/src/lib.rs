//! Trade-to-OHLCV aggregation for the datums warehouse.
//!
//! [`TradeAggregator`] turns a chronologically ordered trade sequence into
//! one [`Ohlcv`] bar per non-empty interval bucket and renders the result in
//! the CSV interchange format consumed by the validator and the storage
//! layer.

#![forbid(unsafe_code)]

mod aggregator;
mod ohlcv;

pub use aggregator::TradeAggregator;
pub use ohlcv::{CSV_HEADER, Ohlcv};
