//! The combination run.
//!
//! A run rebuilds the target branch from the project's default branch plus
//! every open MR carrying the trigger label, pushes it, and reports back on
//! the MR that triggered it. See [`engine`] for the state machine.

pub mod engine;
pub mod notify;

pub use engine::{Combiner, RunOutcome, Stage};
