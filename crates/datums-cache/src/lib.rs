//! Local trade cache for the datums warehouse.
//!
//! [`TradesCache`] is an append-only store of raw trades, compressed in
//! blocks, queryable by inclusive timestamp range. It exists to avoid
//! re-downloading trade history from a rate-limited remote API.

#![forbid(unsafe_code)]

mod cache;

pub use cache::{CacheError, Result, TradesCache};
