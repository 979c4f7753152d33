//! Fairdraw - fair roll-call and lottery picking
//!
//! Picks students or prizes from a pool while keeping the picks balanced over time:
//! candidates picked often get lower weights, long-idle candidates get higher ones,
//! group and gender picks are evened out, and no-repeat modes hand back a
//! reset request once a scope runs out of eligible candidates.
//!
//! - [`weight`]: pure weight computation from history and settings
//! - [`storage`]: durable per-pool history and exclusion cycles
//! - [`history`]: the write path for confirmed rounds, and subject-scoped reads
//! - [`draw`]: repeat modes, weighted sampling and the draw controller

pub mod clock;
pub mod domain;
pub mod draw;
pub mod error;
pub mod history;
pub mod storage;
pub mod weight;

pub use error::{FairDrawError, Result};
