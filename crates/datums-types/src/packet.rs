//! Typed per-packet configuration.

use crate::Interval;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Supported remote trade sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    /// The Kraken public trades API.
    Kraken,
}

/// Configuration for one `(pair, interval)` logical data stream.
///
/// Optional fields are enumerated explicitly and validated when the
/// warehouse configuration is deserialized; unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PacketConfig {
    /// Root directory for this packet's cache and stored bars.
    pub storage: PathBuf,
    /// Bar width in minutes.
    pub interval: Interval,
    /// Instrument identifier as understood by the remote source.
    pub pair: String,
    /// Which remote source serves this packet.
    pub source: SourceType,
    /// CSV columns excluded from outlier detection.
    #[serde(default)]
    pub exclude_outliers: Option<Vec<String>>,
    /// Z-score above which a value counts as an outlier.
    #[serde(default = "default_z_score_threshold")]
    pub z_score_threshold: f64,
    /// Epoch-second starting point for the very first update.
    #[serde(default)]
    pub start: Option<i64>,
}

const fn default_z_score_threshold() -> f64 {
    10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let cfg: PacketConfig = serde_json::from_str(
            r#"{"storage": "/data", "interval": 30, "pair": "XXBTZUSD", "source": "Kraken"}"#,
        )
        .unwrap();
        assert_eq!(cfg.interval, Interval::from_minutes(30));
        assert_eq!(cfg.pair, "XXBTZUSD");
        assert_eq!(cfg.source, SourceType::Kraken);
        assert!(cfg.exclude_outliers.is_none());
        assert!((cfg.z_score_threshold - 10.0).abs() < 1e-10);
        assert!(cfg.start.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let cfg: PacketConfig = serde_json::from_str(
            r#"{
                "storage": "/data",
                "interval": 1,
                "pair": "XETHZUSD",
                "source": "Kraken",
                "exclude_outliers": ["volume", "count"],
                "z_score_threshold": 4.5,
                "start": 1500000000
            }"#,
        )
        .unwrap();
        assert_eq!(
            cfg.exclude_outliers.as_deref(),
            Some(["volume".to_string(), "count".to_string()].as_slice())
        );
        assert!((cfg.z_score_threshold - 4.5).abs() < 1e-10);
        assert_eq!(cfg.start, Some(1_500_000_000));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<PacketConfig, _> = serde_json::from_str(
            r#"{"storage": "/data", "interval": 1, "pair": "X", "source": "Kraken", "bogus": 1}"#,
        );
        assert!(result.is_err());
    }
}
