//! Warehouse configuration loading.

use datums_types::PacketConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected schema.
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// The full warehouse configuration: one [`PacketConfig`] per packet id.
///
/// Serialized as a JSON object keyed by packet id. Unknown fields inside a
/// packet are rejected at load time, so a typo fails fast instead of being
/// silently ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseConfig {
    packets: BTreeMap<String, PacketConfig>,
}

impl WarehouseConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the configuration of one packet, if configured.
    #[must_use]
    pub fn get(&self, packet: &str) -> Option<&PacketConfig> {
        self.packets.get(packet)
    }

    /// Returns all configured packet ids.
    pub fn packet_ids(&self) -> impl Iterator<Item = &str> {
        self.packets.keys().map(String::as_str)
    }

    /// Iterates over `(packet id, config)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PacketConfig)> {
        self.packets.iter().map(|(id, cfg)| (id.as_str(), cfg))
    }

    /// Adds or replaces a packet configuration.
    pub fn insert(&mut self, packet: impl Into<String>, config: PacketConfig) {
        self.packets.insert(packet.into(), config);
    }
}
