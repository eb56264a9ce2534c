//! Kemy active queue management.
//!
//! A [`KemyQueueDisc`] decides, for every arriving packet, whether it enters
//! a bounded FIFO. Two independent limits apply:
//!
//! | Check | Bound | Touches memory |
//! |-------|-------|----------------|
//! | Hard capacity | `occupancy + incoming > limit` | no |
//! | Policy window | `occupancy >= window` | yes, one update per decision |
//!
//! The window is recomputed before each policy comparison by asking the
//! shared [`PolicyTable`](crate::policy::PolicyTable) for the rule that
//! governs the current [`Memory`](crate::policy::Memory) and applying it to
//! the previous window.
//!
//! Occupancy is counted in packets or bytes, fixed at construction, and the
//! same unit feeds the hard check, the window comparison, the control state
//! and the time-weighted statistics.

mod config;
mod controller;
mod errors;
mod occupancy;
mod stats;
mod store;


pub use config::{OccupancyMode, QueueDiscConfig, DEFAULT_LIMIT};
pub use controller::{Admission, KemyQueueDisc, KemyQueueDiscBuilder};
pub use errors::QueueDiscError;
pub use occupancy::OccupancyStatistics;
pub use stats::KemyStats;
pub use store::{FifoStore, Packet, PacketStore, QueueItem};
