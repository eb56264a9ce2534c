//! Running summary of recent queue behaviour used to select a whisker.
//!
//! The memory is fed exactly once per admission decision, either with a
//! "received" or a "dropped" observation. Departures never touch it.

use std::fmt;

/// Number of congestion signals tracked by [`Memory`].
pub const NUM_SIGNALS: usize = 3;

/// EWMA gain applied to every signal.
pub(crate) const EWMA_GAIN: f64 = 1.0 / 8.0;

/// Individual congestion signals summarised by [`Memory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Smoothed interval between accepted arrivals (seconds).
    ArrivalInterval = 0,
    /// Smoothed interval between policy drops (seconds).
    DropInterval = 1,
    /// Smoothed occupancy seen at decision time.
    QueueOccupancy = 2,
}

impl Signal {
    pub const ALL: [Signal; NUM_SIGNALS] = [
        Signal::ArrivalInterval,
        Signal::DropInterval,
        Signal::QueueOccupancy,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Kind of observation fed to the memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryEventKind {
    Received,
    Dropped,
}

/// The most recent observation folded into the memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryEvent {
    pub kind: MemoryEventKind,
    /// Simulated time of the decision, in seconds.
    pub tick: f64,
    /// Occupancy before the decision took effect.
    pub occupancy: u64,
}

/// Control state ("memory") consulted by the policy table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Memory {
    signals: [f64; NUM_SIGNALS],
    last_receive: Option<f64>,
    last_drop: Option<f64>,
    received: u64,
    dropped: u64,
    last_event: Option<MemoryEvent>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a memory with the given signal values and no event history.
    ///
    /// Useful for probing a policy table at a specific point.
    pub fn with_signals(signals: [f64; NUM_SIGNALS]) -> Self {
        Self {
            signals,
            ..Self::default()
        }
    }

    /// Records an accepted packet.
    pub fn packet_receive(&mut self, tick: f64, occupancy: u64) {
        if let Some(previous) = self.last_receive {
            smooth(
                &mut self.signals[Signal::ArrivalInterval.index()],
                (tick - previous).max(0.0),
            );
        }
        self.last_receive = Some(tick);
        self.received += 1;
        self.observe(MemoryEventKind::Received, tick, occupancy);
    }

    /// Records a packet dropped by the policy window.
    pub fn packet_drop(&mut self, tick: f64, occupancy: u64) {
        if let Some(previous) = self.last_drop {
            smooth(
                &mut self.signals[Signal::DropInterval.index()],
                (tick - previous).max(0.0),
            );
        }
        self.last_drop = Some(tick);
        self.dropped += 1;
        self.observe(MemoryEventKind::Dropped, tick, occupancy);
    }

    fn observe(&mut self, kind: MemoryEventKind, tick: f64, occupancy: u64) {
        smooth(
            &mut self.signals[Signal::QueueOccupancy.index()],
            occupancy as f64,
        );
        self.last_event = Some(MemoryEvent {
            kind,
            tick,
            occupancy,
        });
    }

    pub fn signal(&self, signal: Signal) -> f64 {
        self.signals[signal.index()]
    }

    pub fn signals(&self) -> &[f64; NUM_SIGNALS] {
        &self.signals
    }

    /// Number of "received" observations folded in so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Number of "dropped" observations folded in so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn last_event(&self) -> Option<&MemoryEvent> {
        self.last_event.as_ref()
    }
}

fn smooth(current: &mut f64, sample: f64) {
    *current = (1.0 - EWMA_GAIN) * *current + EWMA_GAIN * sample;
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arrival_ewma={:.6}s drop_ewma={:.6}s queue_ewma={:.2}",
            self.signal(Signal::ArrivalInterval),
            self.signal(Signal::DropInterval),
            self.signal(Signal::QueueOccupancy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_memory_is_zeroed() {
        let memory = Memory::new();
        assert_eq!(memory.signals(), &[0.0; NUM_SIGNALS]);
        assert_eq!(memory.received(), 0);
        assert_eq!(memory.dropped(), 0);
        assert!(memory.last_event().is_none());
    }

    #[test]
    fn test_first_receive_only_moves_occupancy() {
        let mut memory = Memory::new();
        memory.packet_receive(1.0, 8);

        assert_eq!(memory.signal(Signal::ArrivalInterval), 0.0);
        assert_eq!(memory.signal(Signal::DropInterval), 0.0);
        assert_eq!(memory.signal(Signal::QueueOccupancy), 1.0);
        assert_eq!(memory.received(), 1);
    }

    #[test]
    fn test_arrival_interval_smoothing() {
        let mut memory = Memory::new();
        memory.packet_receive(1.0, 0);
        memory.packet_receive(1.8, 0);

        // 0.8s gap folded with gain 1/8
        assert!((memory.signal(Signal::ArrivalInterval) - 0.1).abs() < 1e-12);

        memory.packet_receive(2.6, 0);
        let expected = 0.875 * 0.1 + 0.125 * 0.8;
        assert!((memory.signal(Signal::ArrivalInterval) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_drops_track_their_own_interval() {
        let mut memory = Memory::new();
        memory.packet_drop(2.0, 4);
        memory.packet_receive(3.0, 4);
        memory.packet_drop(4.0, 4);

        assert!((memory.signal(Signal::DropInterval) - 0.25).abs() < 1e-12);
        assert_eq!(memory.signal(Signal::ArrivalInterval), 0.0);
        assert_eq!(memory.dropped(), 2);
        assert_eq!(memory.received(), 1);

        let last = memory.last_event().unwrap();
        assert_eq!(last.kind, MemoryEventKind::Dropped);
        assert_eq!(last.tick, 4.0);
        assert_eq!(last.occupancy, 4);
    }

    #[test]
    fn test_display() {
        let memory = Memory::with_signals([0.001, 0.5, 12.0]);
        let display = memory.to_string();
        assert!(display.contains("queue_ewma=12.00"));
    }
}
