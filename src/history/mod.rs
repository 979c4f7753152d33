//! Recording confirmed rounds and reading history by subject.

mod recorder;
mod subject;

pub use recorder::{ConfirmedRound, HistoryRecorder, apply_round};
pub use subject::filter_by_subject;
