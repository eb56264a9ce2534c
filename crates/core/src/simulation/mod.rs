//! Deterministic simulation support.
//!
//! # Architecture
//!
//! - **TimeSource**: abstraction over the clock read by queue disciplines
//! - **VirtualTime**: deterministic time that only advances when stepped
//! - **SimulationRng**: seeded RNG for all random decisions of a run
//! - **Scheduler**: discrete-event queue processing events in a fixed order
//! - **BottleneckSimulation**: Poisson sources feeding a `KemyQueueDisc` in
//!   front of a fixed-rate link
//!
//! The scheduler owns the `VirtualTime`; the queue discipline receives a
//! clone, so both always agree on "now".
//!
//! ```ignore
//! let config = SimulationConfig::default();
//! let policy = Arc::new(demo_policy(OccupancyMode::Packets, 1000)?);
//! let report = BottleneckSimulation::new(&config, policy)?.run();
//! println!("{report}");
//! ```

mod bottleneck;
mod rng;
mod scheduler;
mod time;

pub use bottleneck::{demo_policy, BottleneckSimulation, SimulationReport};
pub use rng::SimulationRng;
pub use scheduler::{Event, EventId, EventType, Scheduler, SchedulerConfig};
pub use time::{RealTime, TimeSource, VirtualTime};
