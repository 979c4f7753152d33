//! Drawing: repeat modes, weighted sampling and the draw controller.
//!
//! # Example
//!
//! ```ignore
//! use fairdraw::domain::{DrawScope, PoolKey};
//! use fairdraw::draw::{DrawController, DrawOutcome, DrawRequest, RepeatMode};
//!
//! let request = DrawRequest::new(DrawScope::whole_pool(PoolKey::roll_call("Class 3")), 1, RepeatMode::NoRepeatUntilExhausted);
//! match controller.draw(&request, &roster, &mut rand::rng())? {
//!     DrawOutcome::Selected(result) => { controller.confirm(&result)?; }
//!     DrawOutcome::ResetRequired(scope) => { controller.reset_exclusions(&scope)?; }
//! }
//! ```

mod controller;
mod display;
mod mode;
mod outcome;
pub mod sampling;

pub use controller::{DrawController, DrawPhase, DrawRequest};
pub use display::{DisplayTemplate, compose_display};
pub use mode::RepeatMode;
pub use outcome::{Assignee, DrawOutcome, DrawResult, PairedDraw, PrizeAssignment};
