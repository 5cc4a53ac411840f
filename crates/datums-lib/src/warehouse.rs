//! Per-packet retrieve/update orchestration.

use datums_source::{KrakenApi, KrakenSource, SourceError};
use datums_storage::{Storage, StorageError};
use datums_types::{CsvDatums, PacketConfig, SourceType};
use std::path::Path;
use thiserror::Error;

use crate::WarehouseConfig;

/// Errors surfaced by warehouse operations.
///
/// A serving layer is expected to map `MissingPacket` onto a 200-status
/// payload carrying an `error` string rather than an HTTP error code;
/// validation warnings never reach this type at all, they are logged at the
/// query boundary.
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// The requested packet id is not configured.
    #[error("the requested packet {0} has not been configured")]
    MissingPacket(String),

    /// The remote source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The storage layer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    /// A packet's update task panicked or was cancelled.
    #[error("update task for packet {0} was aborted")]
    Aborted(String),
}

/// Result type for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;

/// The warehouse: retrieves stored datums and updates them from their
/// remote source, one packet at a time.
///
/// Constructed explicitly from a [`WarehouseConfig`]; cloneable so that
/// independent packet updates can run as separate tasks.
#[derive(Debug, Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
}

impl Warehouse {
    /// Creates a warehouse over the given configuration.
    #[must_use]
    pub const fn new(config: WarehouseConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration the warehouse was built from.
    #[must_use]
    pub const fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Returns all configured packet ids.
    #[must_use]
    pub fn all_packets(&self) -> Vec<String> {
        self.config.packet_ids().map(str::to_string).collect()
    }

    /// Returns the stored datums for a packet, optionally restricted to an
    /// inclusive epoch-second range.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::MissingPacket`] for an unconfigured id and
    /// propagates storage failures.
    pub fn retrieve(
        &self,
        packet: &str,
        since: Option<i64>,
        until: Option<i64>,
    ) -> Result<CsvDatums> {
        let cfg = self.packet(packet)?;
        let storage = make_storage(&cfg.storage, &cfg.pair);
        Ok(storage.get(cfg.interval, since, until)?)
    }

    /// Updates a packet from its remote source and stores the result.
    ///
    /// The starting point continues one interval past the last stored bar;
    /// a packet updated for the first time starts at its configured `start`
    /// (or 0).
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::MissingPacket`] for an unconfigured id and
    /// propagates source and storage failures.
    pub async fn update(&self, packet: &str) -> Result<()> {
        let cfg = self.packet(packet)?;
        let storage = make_storage(&cfg.storage, &cfg.pair);
        let since = starting_point(&storage, cfg)?;

        let datums = match cfg.source {
            SourceType::Kraken => {
                let api = KrakenApi::new()?;
                let source = KrakenSource::new(api, &cfg.storage, &cfg.pair, cfg.interval);
                source
                    .query(
                        since,
                        cfg.exclude_outliers.as_deref(),
                        cfg.z_score_threshold,
                    )
                    .await?
            }
        };
        storage.store(&datums)?;
        tracing::info!(packet, pair = %cfg.pair, interval = %cfg.interval, "packet updated");
        Ok(())
    }

    /// Updates several packets concurrently, one independent task per
    /// packet, and waits for all of them.
    ///
    /// Packets share no mutable state, so one blocked or failing update
    /// does not hold up the others. Returns one result per packet, in the
    /// order given.
    pub async fn update_all(&self, packets: &[String]) -> Vec<(String, Result<()>)> {
        let handles: Vec<_> = packets
            .iter()
            .map(|packet| {
                let warehouse = self.clone();
                let packet = packet.clone();
                tokio::spawn(async move {
                    let result = warehouse.update(&packet).await;
                    (packet, result)
                })
            })
            .collect();

        futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(packets)
            .map(|(joined, packet)| {
                joined.unwrap_or_else(|_| {
                    (packet.clone(), Err(WarehouseError::Aborted(packet.clone())))
                })
            })
            .collect()
    }

    fn packet(&self, id: &str) -> Result<&PacketConfig> {
        self.config
            .get(id)
            .ok_or_else(|| WarehouseError::MissingPacket(id.to_string()))
    }
}

/// Storage for one pair lives in `<storage root>/<pair>/`.
fn make_storage(root: &Path, pair: &str) -> Storage {
    Storage::new(root.join(pair))
}

/// Where the next update should continue from, in epoch seconds.
fn starting_point(storage: &Storage, cfg: &PacketConfig) -> Result<i64> {
    if storage.exists(cfg.interval) {
        Ok(storage.last_time_of(cfg.interval)? + cfg.interval.seconds())
    } else {
        Ok(cfg.start.unwrap_or(0))
    }
}
