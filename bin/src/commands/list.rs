//! List command implementation.

use anyhow::Result;
use datums_lib::Warehouse;

/// Prints every configured packet with its pair and interval.
pub(crate) fn list(warehouse: &Warehouse) -> Result<()> {
    for (id, cfg) in warehouse.config().iter() {
        println!("{id}: pair={}, interval={}m, source={:?}", cfg.pair, cfg.interval, cfg.source);
    }
    Ok(())
}
