//! Remote trade acquisition for the datums warehouse.
//!
//! The pieces fit together as a pipeline: [`KrakenApi`] speaks the exchange
//! protocol, [`KrakenTrades`] pages through it while merging every page into
//! the local [`datums_cache::TradesCache`], and [`KrakenSource`] turns the
//! merged trade range into validated [`datums_types::CsvDatums`].

#![forbid(unsafe_code)]

mod api;
mod error;
mod fetch;
mod source;

pub use api::{KrakenApi, LEDGER_FREQUENCY, TradesApi, TradesPage};
pub use error::{Result, SourceError};
pub use fetch::KrakenTrades;
pub use source::KrakenSource;
