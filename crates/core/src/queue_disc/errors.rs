use thiserror::Error;

/// Construction-time configuration failures of a queue discipline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueDiscError {
    #[error("occupancy mode not set: choose packets or bytes")]
    MissingOccupancyMode,

    #[error("no policy table supplied")]
    MissingPolicyTable,
}
