//! Update command implementation.

use anyhow::{Result, bail};
use datums_lib::Warehouse;

/// Updates the given packets, or every configured one when none are named.
///
/// All updates run concurrently; each packet's outcome is reported
/// individually and any failure makes the whole command fail at the end.
pub(crate) async fn update(warehouse: &Warehouse, packets: Vec<String>) -> Result<()> {
    let packets = if packets.is_empty() {
        warehouse.all_packets()
    } else {
        packets
    };
    if packets.is_empty() {
        bail!("no packets configured");
    }

    let mut failed = 0;
    for (packet, result) in warehouse.update_all(&packets).await {
        match result {
            Ok(()) => tracing::info!(packet, "update complete"),
            Err(e) => {
                failed += 1;
                tracing::error!(packet, error = %e, "update failed");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} packet updates failed", packets.len());
    }
    Ok(())
}
