//! Kemy queue discipline statistics and telemetry.

use crate::policy::Memory;

use super::config::OccupancyMode;

/// Snapshot of a [`KemyQueueDisc`](super::KemyQueueDisc) for telemetry and
/// debugging.
#[derive(Debug, Clone, PartialEq)]
pub struct KemyStats {
    /// Unit occupancy is measured in.
    pub mode: OccupancyMode,
    /// Hard capacity, in `mode` units.
    pub limit: u64,
    /// Current policy window, in `mode` units.
    pub window: u32,
    /// Current occupancy, in `mode` units.
    pub occupancy: u64,
    pub packet_count: usize,
    pub byte_count: usize,
    /// Packets appended to the store.
    pub accepted: u64,
    /// Packets rejected because the hard capacity would be exceeded.
    pub dropped_hard_limit: u64,
    /// Packets rejected by the policy window.
    pub dropped_policy: u64,
    /// Packets handed out by `try_remove`.
    pub dequeued: u64,
    /// Time-weighted mean occupancy, when summary statistics are enabled.
    pub average_occupancy: Option<f64>,
    /// Control state at the time of the snapshot.
    pub memory: Memory,
}

impl KemyStats {
    /// All admission decisions taken so far.
    pub fn arrivals(&self) -> u64 {
        self.accepted + self.dropped_hard_limit + self.dropped_policy
    }

    /// Fraction of arrivals dropped for any reason.
    pub fn drop_ratio(&self) -> f64 {
        match self.arrivals() {
            0 => 0.0,
            n => (self.dropped_hard_limit + self.dropped_policy) as f64 / n as f64,
        }
    }
}

impl std::fmt::Display for KemyStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Kemy[{}] occ={}/{} window={} accepted={} drop_hard={} drop_policy={} dequeued={}",
            self.mode,
            self.occupancy,
            self.limit,
            self.window,
            self.accepted,
            self.dropped_hard_limit,
            self.dropped_policy,
            self.dequeued,
        )?;
        if let Some(avg) = self.average_occupancy {
            write!(f, " avg_occ={avg:.3}")?;
        }
        Ok(())
    }
}
