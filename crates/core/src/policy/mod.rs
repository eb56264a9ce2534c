//! Tabulated control policy consulted on every arrival.
//!
//! ## Model
//!
//! A queue discipline keeps a [`Memory`]: a handful of smoothed congestion
//! signals updated on each admission decision. The policy table maps the
//! memory to one [`Whisker`], a rule that turns the previous window into
//! the next one:
//!
//! ```text
//! memory ──lookup──▶ whisker ──window(prev)──▶ next window
//! ```
//!
//! How the table was learned is not this crate's concern. A table only has
//! to satisfy the [`PolicyTable`] contract: total, deterministic, and free
//! of side effects, so a single table can be shared by many queues.
//!
//! ## Usage
//!
//! ```ignore
//! let mut tree = WhiskerTree::new(Whisker::new(1, 1.0));
//! tree.split([0.01, 0.1, 32.0])?;
//! tree.leaf_mut(&Memory::with_signals([0.0, 0.0, 64.0])).set_transform(0, 0.5);
//! let table: Arc<dyn PolicyTable> = Arc::new(tree);
//! ```

mod memory;
mod tree;
mod whisker;

use thiserror::Error;

pub use memory::{Memory, MemoryEvent, MemoryEventKind, Signal, NUM_SIGNALS};
pub use tree::WhiskerTree;
pub use whisker::{MemoryRange, Whisker, MAX_WINDOW};

/// Lookup contract every policy table must satisfy.
///
/// Implementations must return exactly one rule for any memory (there is no
/// "no match" outcome) and must not mutate observable state, since tables
/// are shared read-only between queue disciplines.
pub trait PolicyTable: Send + Sync {
    fn lookup(&self, memory: &Memory) -> &Whisker;
}

/// A lone rule is a table that always answers with itself.
impl PolicyTable for Whisker {
    fn lookup(&self, _memory: &Memory) -> &Whisker {
        self
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("invalid window bounds: min {min} > max {max} or max above limit")]
    InvalidBounds { min: u32, max: u32 },

    #[error("split pivot {pivot:?} is not strictly inside leaf domain {domain}")]
    PivotOutsideDomain { pivot: Vec<f64>, domain: String },
}
