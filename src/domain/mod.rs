//! Domain types for fairdraw
//!
//! - `Candidate`: a student or prize as supplied by the roster collaborator
//! - `PoolKey`, `DrawFilter`, `DrawScope`: which pool and which slice of it a draw targets
//! - `HistoryRecord` and friends: the persisted per-pool history
//! - `ExclusionCycle`: picks since the last reset of a no-repeat scope

mod candidate;
mod cycle;
mod history;
mod pool;

pub use candidate::Candidate;
pub use cycle::ExclusionCycle;
pub use history::{
    DRAW_METHOD_WEIGHTED, DrawEvent, EntityHistory, HistoryRecord, SubjectAggregate, SubjectTally,
};
pub use pool::{DrawFilter, DrawScope, FilterSentinels, PoolKey, PoolKind};
