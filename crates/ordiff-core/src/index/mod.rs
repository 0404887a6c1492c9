//! Incremental release-pair indexing.

mod engine;
mod error;
mod plan;

pub use engine::{IndexOutcome, IndexProgress, Indexer, ProgressFn};
pub use error::IndexError;
pub use plan::{release_pairs, ProgressPlan, ReleasePair};
