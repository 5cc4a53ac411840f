//! Core types for the datums trade warehouse.
//!
//! This crate provides the fundamental data structures shared by the
//! warehouse crates:
//!
//! - [`Trade`] - A single executed trade with price, volume and timestamp
//! - [`Interval`] - Fixed bar width used for OHLCV aggregation
//! - [`CsvDatums`] - One interval's worth of aggregated bars as CSV text
//! - [`PacketConfig`] - Typed configuration for one `(pair, interval)` stream

#![forbid(unsafe_code)]

mod datums;
mod interval;
mod packet;
mod trade;

pub use datums::CsvDatums;
pub use interval::{Interval, floor_to_interval, to_nano_sec};
pub use packet::{PacketConfig, SourceType};
pub use trade::Trade;
