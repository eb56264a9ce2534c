//! Single-bottleneck simulation driving a [`KemyQueueDisc`].
//!
//! Packets arrive as a Poisson process and queue in front of a fixed-rate
//! link. The link serialises one packet at a time; when it finishes it pulls
//! the next packet from the queue. Scheduler and queue discipline read the
//! same [`VirtualTime`], so every admission decision sees the event time.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{SimulationConfig, TrafficConfig};
use crate::policy::{PolicyError, PolicyTable, Signal, Whisker, WhiskerTree, MAX_WINDOW};
use crate::queue_disc::{KemyQueueDisc, KemyStats, OccupancyMode, Packet, QueueDiscError};

use super::scheduler::{EventType, Scheduler};
use super::time::{TimeSource, VirtualTime};

/// Demonstration policy used by `kemy-sim`.
///
/// Two levels of splits on the smoothed occupancy: below the first pivot the
/// window grows by one packet per arrival, above it the window backs off
/// gently, and above the second pivot it halves. Thresholds are in packets
/// and scaled to bytes with `packet_size` in byte mode; scaled windows are
/// capped at [`MAX_WINDOW`].
pub fn demo_policy(mode: OccupancyMode, packet_size: usize) -> Result<WhiskerTree, PolicyError> {
    let unit = match mode {
        OccupancyMode::Packets => 1,
        OccupancyMode::Bytes => u32::try_from(packet_size).unwrap_or(u32::MAX).max(1),
    };
    let scaled = |packets: u32| packets.saturating_mul(unit).min(MAX_WINDOW);
    let congested = f64::from(scaled(20));
    // the second split must land strictly inside the congested leaf
    let severe = match f64::from(scaled(60)) {
        pivot if pivot > congested => pivot,
        _ => congested * 3.0,
    };

    let mut tree = WhiskerTree::new(Whisker::default());
    tree.split([0.001, 0.01, congested])?;
    tree.split([0.002, 0.02, severe])?;

    let increment = i32::try_from(unit).unwrap_or(i32::MAX);
    for leaf in tree.leaves_mut() {
        let occupancy_floor = leaf.domain().lower()[Signal::QueueOccupancy.index()];
        if occupancy_floor >= severe {
            leaf.set_transform(0, 0.5);
        } else if occupancy_floor >= congested {
            leaf.set_transform(0, 0.9);
        } else {
            leaf.set_transform(increment, 1.0);
        }
        leaf.set_bounds(scaled(4), scaled(200))?;
    }
    Ok(tree)
}

/// Outcome of a [`BottleneckSimulation`] run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub seed: u64,
    /// Simulated time covered, in seconds.
    pub duration_secs: f64,
    /// Packets that left the link.
    pub delivered: u64,
    pub delivered_bytes: u64,
    /// Packet on the link when the run ended.
    pub in_flight: bool,
    /// Queue discipline snapshot at the end of the run.
    pub queue: KemyStats,
}

impl SimulationReport {
    /// Delivered goodput in bits per second.
    pub fn throughput_bps(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.delivered_bytes as f64 * 8.0 / self.duration_secs
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "seed:              {:#x}", self.seed)?;
        writeln!(f, "duration:          {:.3}s", self.duration_secs)?;
        writeln!(f, "arrivals:          {}", self.queue.arrivals())?;
        writeln!(f, "accepted:          {}", self.queue.accepted)?;
        writeln!(f, "dropped (limit):   {}", self.queue.dropped_hard_limit)?;
        writeln!(f, "dropped (policy):  {}", self.queue.dropped_policy)?;
        writeln!(f, "delivered:         {}", self.delivered)?;
        writeln!(
            f,
            "throughput:        {:.3} Mbit/s",
            self.throughput_bps() / 1_000_000.0
        )?;
        writeln!(f, "final window:      {} {}", self.queue.window, self.queue.mode)?;
        match self.queue.average_occupancy {
            Some(avg) => write!(f, "avg occupancy:     {avg:.3} {}", self.queue.mode),
            None => write!(f, "avg occupancy:     (summary stats disabled)"),
        }
    }
}

/// Deterministic bottleneck simulation.
pub struct BottleneckSimulation {
    scheduler: Scheduler,
    queue: KemyQueueDisc<VirtualTime>,
    traffic: TrafficConfig,
    in_flight: Option<Packet>,
    next_packet_id: u64,
    delivered: u64,
    delivered_bytes: u64,
}

impl BottleneckSimulation {
    pub fn new(
        config: &SimulationConfig,
        policy: Arc<dyn PolicyTable>,
    ) -> Result<Self, QueueDiscError> {
        let scheduler = Scheduler::new(config.traffic.seed);
        let queue = KemyQueueDisc::builder()
            .config(&config.queue)
            .policy(policy)
            .build_with_time_source(scheduler.time().clone())?;

        Ok(Self {
            scheduler,
            queue,
            traffic: config.traffic.clone(),
            in_flight: None,
            next_packet_id: 0,
            delivered: 0,
            delivered_bytes: 0,
        })
    }

    pub fn queue(&self) -> &KemyQueueDisc<VirtualTime> {
        &self.queue
    }

    /// Runs until `duration_secs` of simulated time have elapsed.
    pub fn run(&mut self) -> SimulationReport {
        let end = secs_to_nanos(self.traffic.duration_secs);
        tracing::info!(
            seed = self.scheduler.seed(),
            arrival_rate = self.traffic.arrival_rate,
            link_rate = self.traffic.link_rate,
            duration_secs = self.traffic.duration_secs,
            "Starting bottleneck simulation"
        );

        self.schedule_next_arrival();
        while let Some(event) = self.scheduler.step_until(end) {
            match event.event_type {
                EventType::Arrival { packet_id, size } => self.on_arrival(packet_id, size),
                EventType::TransmissionComplete { packet_id } => {
                    self.on_transmission_complete(packet_id)
                }
            }
        }

        let report = self.report();
        tracing::info!(
            arrivals = report.queue.arrivals(),
            delivered = report.delivered,
            drop_ratio = report.queue.drop_ratio(),
            "Simulation finished"
        );
        report
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            seed: self.scheduler.seed(),
            duration_secs: self.scheduler.time().now_secs(),
            delivered: self.delivered,
            delivered_bytes: self.delivered_bytes,
            in_flight: self.in_flight.is_some(),
            queue: self.queue.stats(),
        }
    }

    fn on_arrival(&mut self, packet_id: u64, size: usize) {
        self.queue.try_admit(Packet::new(packet_id, size));
        if self.in_flight.is_none() {
            self.start_transmission();
        }
        self.schedule_next_arrival();
    }

    fn on_transmission_complete(&mut self, packet_id: u64) {
        match self.in_flight.take() {
            Some(packet) if packet.id == packet_id => {
                self.delivered += 1;
                self.delivered_bytes += packet.size as u64;
            }
            other => {
                tracing::warn!(packet_id, in_flight = ?other, "Unexpected transmission completion");
                self.in_flight = other;
                return;
            }
        }
        self.start_transmission();
    }

    fn start_transmission(&mut self) {
        let Some(packet) = self.queue.try_remove() else {
            return;
        };
        let serialisation =
            Duration::try_from_secs_f64(packet.size as f64 / self.traffic.link_rate)
                .unwrap_or(Duration::MAX);
        self.scheduler.schedule_after(
            serialisation,
            EventType::TransmissionComplete {
                packet_id: packet.id,
            },
        );
        self.in_flight = Some(packet);
    }

    fn schedule_next_arrival(&mut self) {
        let gap = self
            .scheduler
            .rng()
            .gen_exponential(self.traffic.arrival_rate);
        self.next_packet_id += 1;
        self.scheduler.schedule_after(
            gap,
            EventType::Arrival {
                packet_id: self.next_packet_id,
                size: self.traffic.packet_size,
            },
        );
    }
}

fn secs_to_nanos(secs: f64) -> u64 {
    Duration::try_from_secs_f64(secs)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(u64::MAX)
}
