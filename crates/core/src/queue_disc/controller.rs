//! Kemy admission controller.
//!
//! Every arrival runs the same pipeline:
//!
//! 1. sample the occupancy statistics (if enabled), before the packet counts
//! 2. hard capacity check, which never consults or touches the control state
//! 3. policy lookup with the current memory and window recomputation
//! 4. policy comparison, followed by exactly one memory update
//!
//! Departures only sample statistics and pop the head of the store.

use std::sync::Arc;

use crate::policy::{Memory, PolicyTable};
use crate::simulation::{RealTime, TimeSource};

use super::config::{OccupancyMode, QueueDiscConfig, DEFAULT_LIMIT};
use super::errors::QueueDiscError;
use super::occupancy::OccupancyStatistics;
use super::stats::KemyStats;
use super::store::{FifoStore, PacketStore, QueueItem};

/// Outcome of an admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Admission {
    /// Packet appended to the store.
    Accepted,
    /// Admitting the packet would push occupancy past the hard capacity.
    DroppedHardLimit,
    /// Occupancy already reached the policy window.
    DroppedPolicy,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    accepted: u64,
    dropped_hard_limit: u64,
    dropped_policy: u64,
    dequeued: u64,
}

/// Builder validating the configuration surface of a [`KemyQueueDisc`].
///
/// The occupancy mode and the policy table have no defaults; `build*` fails
/// with a [`QueueDiscError`] when either is missing.
#[derive(Clone)]
pub struct KemyQueueDiscBuilder {
    mode: Option<OccupancyMode>,
    limit: u64,
    summary_stats: bool,
    policy: Option<Arc<dyn PolicyTable>>,
}

impl Default for KemyQueueDiscBuilder {
    fn default() -> Self {
        Self {
            mode: None,
            limit: DEFAULT_LIMIT,
            summary_stats: false,
            policy: None,
        }
    }
}

impl KemyQueueDiscBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes mode, limit and statistics flag from `config`.
    pub fn config(mut self, config: &QueueDiscConfig) -> Self {
        self.mode = config.mode;
        self.limit = config.limit;
        self.summary_stats = config.summary_stats;
        self
    }

    pub fn mode(mut self, mode: OccupancyMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn summary_stats(mut self, enabled: bool) -> Self {
        self.summary_stats = enabled;
        self
    }

    /// Policy table shared (read-only) with any other queue using it.
    pub fn policy(mut self, policy: Arc<dyn PolicyTable>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Builds a queue discipline reading the wall clock.
    pub fn build(self) -> Result<KemyQueueDisc, QueueDiscError> {
        self.build_with_time_source(RealTime::new())
    }

    /// Builds a queue discipline with a custom time source.
    pub fn build_with_time_source<T: TimeSource>(
        self,
        time_source: T,
    ) -> Result<KemyQueueDisc<T>, QueueDiscError> {
        self.build_with_parts(time_source, FifoStore::new())
    }

    /// Builds a queue discipline with a custom time source and packet store.
    ///
    /// The store is expected to be empty; packets already in it still count
    /// towards occupancy.
    pub fn build_with_parts<T: TimeSource, S: PacketStore>(
        self,
        time_source: T,
        store: S,
    ) -> Result<KemyQueueDisc<T, S>, QueueDiscError> {
        let mode = self.mode.ok_or(QueueDiscError::MissingOccupancyMode)?;
        let policy = self.policy.ok_or(QueueDiscError::MissingPolicyTable)?;

        tracing::debug!(
            %mode,
            limit = self.limit,
            summary_stats = self.summary_stats,
            "Kemy queue discipline created"
        );

        Ok(KemyQueueDisc {
            mode,
            limit: self.limit,
            summary_stats: self.summary_stats,
            policy,
            memory: Memory::new(),
            window: 0,
            occupancy_stats: OccupancyStatistics::new(),
            store,
            counters: Counters::default(),
            time_source,
        })
    }
}

/// Queue discipline whose admission window is driven by a policy table.
///
/// ## Type Parameters
///
/// `T` is the clock the controller reads on every decision. Defaults to
/// `RealTime`; simulations share a `VirtualTime` with their scheduler.
/// `S` is the packet buffer, a `FifoStore` of [`Packet`](super::Packet)s by
/// default.
///
/// The controller exclusively owns its store, memory, window and statistics.
/// Only the policy table is shared.
pub struct KemyQueueDisc<T: TimeSource = RealTime, S: PacketStore = FifoStore> {
    mode: OccupancyMode,
    limit: u64,
    summary_stats: bool,
    policy: Arc<dyn PolicyTable>,
    memory: Memory,
    /// Starts at 0: nothing is admitted before the first lookup sets it.
    window: u32,
    occupancy_stats: OccupancyStatistics,
    store: S,
    counters: Counters,
    time_source: T,
}

impl KemyQueueDisc {
    pub fn builder() -> KemyQueueDiscBuilder {
        KemyQueueDiscBuilder::new()
    }
}

impl<T: TimeSource, S: PacketStore> KemyQueueDisc<T, S> {
    /// Runs the admission pipeline for `packet` at the current time.
    pub fn try_admit(&mut self, packet: S::Item) -> Admission {
        let now = self.time_source.now_secs();
        let occupancy = self.occupancy();
        if self.summary_stats {
            self.sample_stats(now, occupancy);
        }

        let incoming = self.units_of(&packet);
        if occupancy.saturating_add(incoming) > self.limit {
            self.counters.dropped_hard_limit += 1;
            tracing::warn!(
                occupancy,
                incoming,
                limit = self.limit,
                mode = %self.mode,
                "Hard limit reached, dropping packet"
            );
            return Admission::DroppedHardLimit;
        }

        let previous = self.window;
        self.window = self.policy.lookup(&self.memory).window(previous);
        if self.window != previous {
            tracing::debug!(previous, window = self.window, "Window updated");
        }

        if occupancy >= u64::from(self.window) {
            self.memory.packet_drop(now, occupancy);
            self.counters.dropped_policy += 1;
            tracing::debug!(
                occupancy,
                window = self.window,
                memory = %self.memory,
                "Policy drop"
            );
            Admission::DroppedPolicy
        } else {
            self.memory.packet_receive(now, occupancy);
            self.store.push_back(packet);
            self.counters.accepted += 1;
            tracing::trace!(occupancy, window = self.window, "Packet accepted");
            Admission::Accepted
        }
    }

    /// Removes the head packet, sampling statistics before it leaves.
    ///
    /// Departures never update the control state.
    pub fn try_remove(&mut self) -> Option<S::Item> {
        if self.summary_stats {
            let now = self.time_source.now_secs();
            let occupancy = self.occupancy();
            self.sample_stats(now, occupancy);
        }

        let packet = self.store.pop_front()?;
        self.counters.dequeued += 1;
        tracing::debug!(
            size = packet.size(),
            remaining = self.store.packet_count(),
            "Packet dequeued"
        );
        Some(packet)
    }

    pub fn peek(&self) -> Option<&S::Item> {
        self.store.peek()
    }

    /// Current occupancy in the configured unit.
    pub fn occupancy(&self) -> u64 {
        match self.mode {
            OccupancyMode::Packets => self.store.packet_count() as u64,
            OccupancyMode::Bytes => self.store.byte_count() as u64,
        }
    }

    pub fn packet_count(&self) -> usize {
        self.store.packet_count()
    }

    pub fn byte_count(&self) -> usize {
        self.store.byte_count()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn mode(&self) -> OccupancyMode {
        self.mode
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Window computed by the most recent policy lookup.
    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Time-weighted mean occupancy; 0 when summary statistics are off.
    pub fn average_occupancy(&self) -> f64 {
        if self.summary_stats {
            self.occupancy_stats.average()
        } else {
            0.0
        }
    }

    pub fn stats(&self) -> KemyStats {
        KemyStats {
            mode: self.mode,
            limit: self.limit,
            window: self.window,
            occupancy: self.occupancy(),
            packet_count: self.store.packet_count(),
            byte_count: self.store.byte_count(),
            accepted: self.counters.accepted,
            dropped_hard_limit: self.counters.dropped_hard_limit,
            dropped_policy: self.counters.dropped_policy,
            dequeued: self.counters.dequeued,
            average_occupancy: self
                .summary_stats
                .then(|| self.occupancy_stats.average()),
            memory: self.memory.clone(),
        }
    }

    fn units_of(&self, packet: &S::Item) -> u64 {
        match self.mode {
            OccupancyMode::Packets => 1,
            OccupancyMode::Bytes => packet.size() as u64,
        }
    }

    fn sample_stats(&mut self, now: f64, occupancy: u64) {
        if self.occupancy_stats.sample(now, occupancy) {
            tracing::trace!(
                now,
                occupancy,
                average = self.occupancy_stats.average(),
                "Occupancy sampled"
            );
        } else if now < self.occupancy_stats.last_update() {
            tracing::warn!(
                now,
                last_update = self.occupancy_stats.last_update(),
                "Clock went backwards, occupancy sample ignored"
            );
        }
    }
}

impl<T: TimeSource, S: PacketStore> std::fmt::Debug for KemyQueueDisc<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KemyQueueDisc")
            .field("mode", &self.mode)
            .field("limit", &self.limit)
            .field("window", &self.window)
            .field("occupancy", &self.occupancy())
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}
