//! Movement input: which of the four movement keys are held.
//!
//! # Invariants
//! - The simulation consumes an [`InputState`] value, never raw key events.
//! - Unrecognized key codes are ignored, never an error.
//! - [`InputLatch`] has one writer (key callbacks) and one reader (the frame).

pub mod key;
pub mod latch;

pub use key::{InputState, MoveKey};
pub use latch::InputLatch;
