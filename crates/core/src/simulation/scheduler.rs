//! Deterministic event scheduler for simulation.
//!
//! The scheduler processes events in a deterministic order based on:
//! 1. Event timestamp (earlier first)
//! 2. Event type (for same timestamp; transmissions complete before arrivals)
//! 3. Event ID (for complete tie-breaking)

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use super::{
    rng::SimulationRng,
    time::{TimeSource, VirtualTime},
};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u64);

impl EventId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Types of events that can be scheduled.
///
/// Variant order matters: it is the tie-breaker for events sharing a
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventType {
    /// The link finished serialising the packet at the head of the line.
    TransmissionComplete {
        /// Packet that left the link
        packet_id: u64,
    },
    /// A packet reaches the bottleneck queue.
    Arrival {
        /// Packet identifier
        packet_id: u64,
        /// Packet size in bytes
        size: usize,
    },
}

/// A scheduled event in the simulation.
#[derive(Debug, Clone)]
pub struct Event {
    /// When this event should be processed (virtual nanos)
    pub timestamp: u64,
    /// Unique identifier for ordering ties
    pub id: EventId,
    /// The event type and payload
    pub event_type: EventType,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reverse ordering so smallest timestamp comes first
        match other.timestamp.cmp(&self.timestamp) {
            Ordering::Equal => match other.event_type.cmp(&self.event_type) {
                Ordering::Equal => other.id.0.cmp(&self.id.0),
                ord => ord,
            },
            ord => ord,
        }
    }
}

/// Configuration for the scheduler.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Keep every processed event for replay verification
    pub record_events: bool,
    /// Whether to log events as they're processed
    pub trace_events: bool,
}

/// Deterministic event scheduler for simulation.
///
/// Processes events in timestamp order with deterministic tie-breaking.
/// All randomness goes through the seeded RNG.
pub struct Scheduler {
    /// Virtual time for the simulation
    time: VirtualTime,
    /// Seeded RNG for deterministic decisions
    rng: SimulationRng,
    /// Priority queue of pending events
    pending_events: BinaryHeap<Event>,
    /// Counter for generating unique event IDs
    next_event_id: u64,
    /// Log of processed events (only filled with `record_events`)
    event_log: Vec<Event>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a new scheduler with the given seed.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, SchedulerConfig::default())
    }

    /// Creates a new scheduler with the given seed and configuration.
    pub fn with_config(seed: u64, config: SchedulerConfig) -> Self {
        Self {
            time: VirtualTime::new(),
            rng: SimulationRng::new(seed),
            pending_events: BinaryHeap::new(),
            next_event_id: 0,
            event_log: Vec::new(),
            config,
        }
    }

    /// Returns a reference to the virtual time.
    ///
    /// Clone it to hand the same clock to a queue discipline.
    pub fn time(&self) -> &VirtualTime {
        &self.time
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn now(&self) -> u64 {
        self.time.now_nanos()
    }

    /// Returns the RNG.
    pub fn rng(&mut self) -> &mut SimulationRng {
        &mut self.rng
    }

    /// Returns the seed used for this scheduler.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Returns the number of pending events.
    pub fn pending_count(&self) -> usize {
        self.pending_events.len()
    }

    /// Returns the event log for replay verification.
    pub fn event_log(&self) -> &[Event] {
        &self.event_log
    }

    /// Schedules an event at the given absolute timestamp.
    pub fn schedule_at(&mut self, timestamp: u64, event_type: EventType) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;

        self.pending_events.push(Event {
            timestamp,
            id,
            event_type,
        });
        id
    }

    /// Schedules an event after the given delay from now.
    pub fn schedule_after(&mut self, delay: Duration, event_type: EventType) -> EventId {
        let delay_nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        let timestamp = self.now().saturating_add(delay_nanos);
        self.schedule_at(timestamp, event_type)
    }

    /// Returns the timestamp of the next pending event, if any.
    pub fn next_event_time(&self) -> Option<u64> {
        self.pending_events.peek().map(|e| e.timestamp)
    }

    /// Pops the next pending event, advancing time to its timestamp.
    ///
    /// Events scheduled in the past are delivered at the current time.
    pub fn step(&mut self) -> Option<Event> {
        let event = self.pending_events.pop()?;
        self.time.advance_to(event.timestamp);

        if self.config.trace_events {
            tracing::trace!(
                timestamp = event.timestamp,
                id = event.id.0,
                ?event.event_type,
                "Processing event"
            );
        }

        if self.config.record_events {
            self.event_log.push(event.clone());
        }
        Some(event)
    }

    /// Pops the next event if it is due at or before `target_time`.
    ///
    /// When nothing else is due, time is advanced to `target_time` and
    /// `None` is returned.
    pub fn step_until(&mut self, target_time: u64) -> Option<Event> {
        match self.next_event_time() {
            Some(next) if next <= target_time => self.step(),
            _ => {
                self.time.advance_to(target_time);
                None
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("seed", &self.rng.seed())
            .field("pending_count", &self.pending_count())
            .field("event_log_len", &self.event_log.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(packet_id: u64) -> EventType {
        EventType::Arrival {
            packet_id,
            size: 1000,
        }
    }

    #[test]
    fn test_scheduler_basic() {
        let mut scheduler = Scheduler::new(42);

        scheduler.schedule_at(100, arrival(1));
        scheduler.schedule_at(50, arrival(2));
        scheduler.schedule_at(200, arrival(3));

        let e1 = scheduler.step().unwrap();
        assert_eq!(e1.timestamp, 50);

        let e2 = scheduler.step().unwrap();
        assert_eq!(e2.timestamp, 100);

        let e3 = scheduler.step().unwrap();
        assert_eq!(e3.timestamp, 200);

        assert!(scheduler.step().is_none());
    }

    #[test]
    fn test_scheduler_time_advancement() {
        let mut scheduler = Scheduler::new(42);
        scheduler.schedule_at(1000, arrival(1));

        assert_eq!(scheduler.now(), 0);
        scheduler.step();
        assert_eq!(scheduler.now(), 1000);
    }

    #[test]
    fn test_transmission_complete_before_arrival_at_same_time() {
        let mut scheduler = Scheduler::new(42);

        scheduler.schedule_at(100, arrival(7));
        scheduler.schedule_at(100, EventType::TransmissionComplete { packet_id: 3 });

        let first = scheduler.step().unwrap();
        assert!(matches!(
            first.event_type,
            EventType::TransmissionComplete { packet_id: 3 }
        ));
        let second = scheduler.step().unwrap();
        assert!(matches!(second.event_type, EventType::Arrival { packet_id: 7, .. }));
    }

    #[test]
    fn test_same_type_same_time_is_fifo() {
        let mut scheduler = Scheduler::new(42);
        let id1 = scheduler.schedule_at(100, arrival(1));
        let id2 = scheduler.schedule_at(100, arrival(1));

        assert_eq!(scheduler.step().unwrap().id, id1);
        assert_eq!(scheduler.step().unwrap().id, id2);
    }

    #[test]
    fn test_step_until() {
        let mut scheduler = Scheduler::new(42);
        for i in 1..=5 {
            scheduler.schedule_at(i * 100, arrival(i));
        }

        let mut processed = 0;
        while scheduler.step_until(250).is_some() {
            processed += 1;
        }
        assert_eq!(processed, 2);
        assert_eq!(scheduler.now(), 250);
        assert_eq!(scheduler.pending_count(), 3);
    }

    #[test]
    fn test_schedule_after_is_relative() {
        let mut scheduler = Scheduler::new(42);
        scheduler.schedule_at(400, arrival(1));
        scheduler.step();

        scheduler.schedule_after(Duration::from_nanos(50), arrival(2));
        assert_eq!(scheduler.next_event_time(), Some(450));

        scheduler.schedule_after(Duration::MAX, arrival(3));
        scheduler.step();
        assert_eq!(scheduler.next_event_time(), Some(u64::MAX));
    }

    #[test]
    fn test_scheduler_determinism() {
        fn run_simulation(seed: u64) -> Vec<(u64, EventId)> {
            let mut scheduler = Scheduler::with_config(
                seed,
                SchedulerConfig {
                    record_events: true,
                    trace_events: false,
                },
            );

            for i in 0..20 {
                let delay = scheduler.rng().gen_range_inclusive(0..=1000) as u64;
                scheduler.schedule_at(delay, arrival(i));
            }

            while scheduler.step().is_some() {}
            scheduler
                .event_log()
                .iter()
                .map(|e| (e.timestamp, e.id))
                .collect()
        }

        let result1 = run_simulation(42);
        let result2 = run_simulation(42);
        assert_eq!(result1, result2);

        let result3 = run_simulation(43);
        assert_ne!(result1, result3);
    }

    #[test]
    fn test_event_log_disabled_by_default() {
        let mut scheduler = Scheduler::new(1);
        scheduler.schedule_at(10, arrival(1));
        scheduler.step();
        assert!(scheduler.event_log().is_empty());
    }
}
