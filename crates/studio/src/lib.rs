//! Studio: a sixteen-step sequencer that produces trigger events for an
//! external synth.
//!
//! # Invariants
//! - Pattern generation and lead notes are deterministic for a given seed.
//! - The transport fires every step exactly once, in order, no matter how
//!   the elapsed time is sliced across `advance` calls.

mod pattern;
mod rng;
mod transport;

pub use pattern::{Pattern, STEPS};
pub use rng::StepRng;
pub use transport::{StepEvent, StudioError, Transport, Trigger, frequency_to_midi};
