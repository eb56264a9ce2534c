//! Queue discipline configuration.

use serde::{Deserialize, Serialize};

/// Default hard capacity, in units of the configured occupancy mode.
pub const DEFAULT_LIMIT: u64 = 1000;

/// Unit in which occupancy is measured.
///
/// The same unit is used for the hard limit, the policy window comparison,
/// the statistics samples and the control-state updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyMode {
    Packets,
    Bytes,
}

impl std::fmt::Display for OccupancyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OccupancyMode::Packets => write!(f, "packets"),
            OccupancyMode::Bytes => write!(f, "bytes"),
        }
    }
}

/// Construction-time settings of a [`KemyQueueDisc`](super::KemyQueueDisc).
///
/// `mode` has no serde default: a configuration file that omits it fails at
/// build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDiscConfig {
    #[serde(default)]
    pub mode: Option<OccupancyMode>,
    /// Hard capacity in packets or bytes.
    #[serde(default = "default_limit")]
    pub limit: u64,
    /// Track the time-weighted average occupancy.
    #[serde(default)]
    pub summary_stats: bool,
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Default for QueueDiscConfig {
    fn default() -> Self {
        Self {
            mode: Some(OccupancyMode::Packets),
            limit: DEFAULT_LIMIT,
            summary_stats: false,
        }
    }
}

impl QueueDiscConfig {
    pub fn packets(limit: u64) -> Self {
        Self {
            mode: Some(OccupancyMode::Packets),
            limit,
            ..Default::default()
        }
    }

    pub fn bytes(limit: u64) -> Self {
        Self {
            mode: Some(OccupancyMode::Bytes),
            limit,
            ..Default::default()
        }
    }

    pub fn with_summary_stats(mut self, enabled: bool) -> Self {
        self.summary_stats = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueDiscConfig::default();
        assert_eq!(config.mode, Some(OccupancyMode::Packets));
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(!config.summary_stats);
    }

    #[test]
    fn test_missing_mode_stays_unset() {
        let config: QueueDiscConfig = toml::from_str("limit = 20").unwrap();
        assert_eq!(config.mode, None);
        assert_eq!(config.limit, 20);
    }

    #[test]
    fn test_mode_is_lowercase() {
        let config: QueueDiscConfig =
            toml::from_str("mode = \"bytes\"\nsummary_stats = true").unwrap();
        assert_eq!(config.mode, Some(OccupancyMode::Bytes));
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(config.summary_stats);

        assert!(toml::from_str::<QueueDiscConfig>("mode = \"Bytes\"").is_err());
    }
}
