//! Kemy active queue management.
//!
//! A bounded packet queue whose admission window is chosen, packet by
//! packet, by a precomputed control policy (a "whisker tree") keyed on a
//! running summary of recent queue behaviour.

/// Simulator configuration (TOML file and command line).
pub mod config;

/// Control state, policy rules and the policy table contract.
pub mod policy;

/// The admission controller and its packet store.
pub mod queue_disc;

/// Deterministic clock, scheduler and the bottleneck driver.
pub mod simulation;

/// Tracing subscriber setup.
pub mod tracing;

pub use policy::{Memory, PolicyTable, Whisker, WhiskerTree};
pub use queue_disc::{Admission, KemyQueueDisc, OccupancyMode, QueueDiscConfig};
