//! datums - a trade data warehouse.
//!
//! Ingests raw trades from an exchange, aggregates them into fixed-interval
//! OHLCV bars, caches trades locally to avoid redundant network calls, and
//! persists the aggregated bars in compressed window files.
//!
//! [`Warehouse`] is the entry point: construct it from a
//! [`WarehouseConfig`] and call [`Warehouse::update`] or
//! [`Warehouse::retrieve`] per configured packet. There is no ambient
//! global state; every dependency is passed explicitly.

#![forbid(unsafe_code)]

mod config;
mod warehouse;

pub use config::{ConfigError, WarehouseConfig};
pub use warehouse::{Result, Warehouse, WarehouseError};

pub use datums_aggregate::{CSV_HEADER, Ohlcv, TradeAggregator};
pub use datums_cache::{CacheError, TradesCache};
pub use datums_source::{KrakenApi, KrakenSource, KrakenTrades, SourceError, TradesApi};
pub use datums_storage::{Storage, StorageError};
pub use datums_types::{
    CsvDatums, Interval, PacketConfig, SourceType, Trade, floor_to_interval, to_nano_sec,
};
pub use datums_validate::{DataError, validate};
