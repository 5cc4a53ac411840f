//! Raw trade representation.

use serde::{Deserialize, Serialize};

/// A single executed trade as reported by the exchange.
///
/// Trades are immutable once recorded. They arrive in chronological order,
/// which the cache relies on to maintain its high-water mark; a global sort
/// is not required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Execution price.
    pub price: f64,
    /// Executed volume.
    pub volume: f64,
    /// Execution time in seconds since the Unix epoch, with subsecond
    /// precision.
    pub timestamp: f64,
}

impl Trade {
    /// Size in bytes of a packed trade record (three little-endian `f64`s).
    pub const PACKED_SIZE: usize = 24;

    /// Creates a new trade.
    #[must_use]
    pub const fn new(price: f64, volume: f64, timestamp: f64) -> Self {
        Self {
            price,
            volume,
            timestamp,
        }
    }
}
