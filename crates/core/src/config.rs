//! Configuration of the bottleneck simulator.
//!
//! Values come from an optional TOML file and are then overridden by
//! command line flags or their `KEMY_*` environment variables:
//!
//! ```toml
//! [queue]
//! mode = "packets"
//! limit = 100
//! summary_stats = true
//!
//! [traffic]
//! arrival_rate = 1200.0   # packets per second
//! link_rate = 1250000.0   # bytes per second
//! packet_size = 1000
//! duration_secs = 10.0
//! seed = 7
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::queue_disc::{OccupancyMode, QueueDiscConfig, QueueDiscError};

/// 1200 packets/s of 1000 bytes offers 9.6 Mbit/s.
pub const DEFAULT_ARRIVAL_RATE: f64 = 1200.0;
/// 10 Mbit/s link, in bytes per second.
pub const DEFAULT_LINK_RATE: f64 = 1_250_000.0;
pub const DEFAULT_PACKET_SIZE: usize = 1000;
pub const DEFAULT_DURATION_SECS: f64 = 10.0;
pub const DEFAULT_SEED: u64 = 0x6b65_6d79;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    QueueDisc(#[from] QueueDiscError),

    #[error("{name} must be finite and positive, got {value}")]
    InvalidRate { name: &'static str, value: f64 },
}

/// Offered load and link characteristics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Mean Poisson arrival rate, in packets per second.
    pub arrival_rate: f64,
    /// Bottleneck service rate, in bytes per second.
    pub link_rate: f64,
    /// Size of every generated packet, in bytes.
    pub packet_size: usize,
    /// Simulated time to run for.
    pub duration_secs: f64,
    pub seed: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            arrival_rate: DEFAULT_ARRIVAL_RATE,
            link_rate: DEFAULT_LINK_RATE,
            packet_size: DEFAULT_PACKET_SIZE,
            duration_secs: DEFAULT_DURATION_SECS,
            seed: DEFAULT_SEED,
        }
    }
}

/// Complete simulator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub queue: QueueDiscConfig,
    #[serde(default)]
    pub traffic: TrafficConfig,
}

impl SimulationConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Occupancy unit of the queue; a config without one is rejected.
    pub fn occupancy_mode(&self) -> Result<OccupancyMode, ConfigError> {
        Ok(self
            .queue
            .mode
            .ok_or(QueueDiscError::MissingOccupancyMode)?)
    }

    /// Rejects settings the simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.occupancy_mode()?;

        let checks = [
            ("arrival_rate", self.traffic.arrival_rate),
            ("link_rate", self.traffic.link_rate),
            ("packet_size", self.traffic.packet_size as f64),
            ("duration_secs", self.traffic.duration_secs),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// Command line of `kemy-sim`.
#[derive(clap::Parser, Debug, Clone, Default)]
#[command(name = "kemy-sim", version, about = "Single-bottleneck Kemy AQM simulation")]
pub struct SimulationArgs {
    /// TOML file with `[queue]` and `[traffic]` tables.
    #[arg(long, short, env = "KEMY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Unit used for occupancy.
    #[arg(long, value_enum, env = "KEMY_MODE")]
    pub mode: Option<OccupancyMode>,

    /// Hard queue capacity, in `mode` units.
    #[arg(long, env = "KEMY_LIMIT")]
    pub limit: Option<u64>,

    /// Track the time-weighted average occupancy.
    #[arg(long, env = "KEMY_SUMMARY_STATS")]
    pub summary_stats: Option<bool>,

    /// Packets per second.
    #[arg(long, env = "KEMY_ARRIVAL_RATE")]
    pub arrival_rate: Option<f64>,

    /// Bytes per second.
    #[arg(long, env = "KEMY_LINK_RATE")]
    pub link_rate: Option<f64>,

    #[arg(long, env = "KEMY_PACKET_SIZE")]
    pub packet_size: Option<usize>,

    /// Simulated seconds.
    #[arg(long, env = "KEMY_DURATION_SECS")]
    pub duration_secs: Option<f64>,

    #[arg(long, env = "KEMY_SEED")]
    pub seed: Option<u64>,

    #[arg(long, env = "KEMY_LOG_LEVEL")]
    pub log_level: Option<LevelFilter>,
}

impl SimulationArgs {
    /// Loads the config file (if any), applies overrides and validates.
    pub fn build(&self) -> Result<SimulationConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading simulation config");
                SimulationConfig::load(path)?
            }
            None => SimulationConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.queue.mode = Some(mode);
        }
        if let Some(limit) = self.limit {
            config.queue.limit = limit;
        }
        if let Some(enabled) = self.summary_stats {
            config.queue.summary_stats = enabled;
        }

        let traffic = &mut config.traffic;
        if let Some(rate) = self.arrival_rate {
            traffic.arrival_rate = rate;
        }
        if let Some(rate) = self.link_rate {
            traffic.link_rate = rate;
        }
        if let Some(size) = self.packet_size {
            traffic.packet_size = size;
        }
        if let Some(secs) = self.duration_secs {
            traffic.duration_secs = secs;
        }
        if let Some(seed) = self.seed {
            traffic.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}
