//! Time abstraction layer for deterministic simulation.
//!
//! This module provides:
//! - `TimeSource` trait for abstracting the clock read by queue disciplines
//! - `RealTime` implementation backed by a monotonic `Instant`
//! - `VirtualTime` implementation for deterministic simulation

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Abstraction over the simulation clock.
///
/// Implementations must be monotonic non-decreasing: consecutive calls to
/// [`TimeSource::now_nanos`] never return a smaller value.
pub trait TimeSource: Send + Sync + Clone + 'static {
    /// Returns the current time as nanoseconds since an arbitrary epoch.
    fn now_nanos(&self) -> u64;

    /// Returns the current time as a Duration since an arbitrary epoch.
    fn now(&self) -> Duration {
        Duration::from_nanos(self.now_nanos())
    }

    /// Returns the current time in (fractional) seconds since the epoch.
    ///
    /// Control state and occupancy statistics are kept in seconds.
    fn now_secs(&self) -> f64 {
        self.now_nanos() as f64 / NANOS_PER_SEC
    }
}

/// Wall-clock time measured from the moment the source was created.
#[derive(Clone)]
pub struct RealTime {
    epoch: std::time::Instant,
}

impl Default for RealTime {
    fn default() -> Self {
        Self::new()
    }
}

impl RealTime {
    pub fn new() -> Self {
        Self {
            epoch: std::time::Instant::now(),
        }
    }
}

impl TimeSource for RealTime {
    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }
}

/// Virtual time implementation for deterministic simulation.
///
/// Time only advances when explicitly stepped via `advance()` or
/// `advance_to()`. Clones share the same clock, so a simulation driver can
/// hold one handle while a queue discipline reads another.
#[derive(Clone, Debug)]
pub struct VirtualTime {
    current_nanos: Arc<AtomicU64>,
}

impl Default for VirtualTime {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualTime {
    /// Creates a new virtual time starting at 0.
    pub fn new() -> Self {
        Self::with_initial_time(0)
    }

    /// Creates a new virtual time starting at the given nanoseconds.
    pub fn with_initial_time(initial_nanos: u64) -> Self {
        Self {
            current_nanos: Arc::new(AtomicU64::new(initial_nanos)),
        }
    }

    /// Advances time by the given duration and returns the new time.
    pub fn advance(&self, duration: Duration) -> u64 {
        let new_time = self
            .current_nanos
            .load(Ordering::SeqCst)
            .saturating_add(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
        self.advance_to(new_time)
    }

    /// Advances time to the given absolute nanoseconds.
    ///
    /// Targets in the past are ignored: virtual time never runs backwards.
    /// Returns the (possibly unchanged) current time.
    pub fn advance_to(&self, target_nanos: u64) -> u64 {
        self.current_nanos
            .fetch_max(target_nanos, Ordering::SeqCst)
            .max(target_nanos)
    }

    /// Advances time to the given absolute time in seconds.
    pub fn advance_to_secs(&self, secs: f64) -> u64 {
        self.advance_to((secs * NANOS_PER_SEC) as u64)
    }
}

impl TimeSource for VirtualTime {
    fn now_nanos(&self) -> u64 {
        self.current_nanos.load(Ordering::SeqCst)
    }
}
