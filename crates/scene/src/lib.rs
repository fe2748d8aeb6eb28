//! Scene configuration: the static obstacle and portal sets of every scene.
//!
//! # Invariants
//! - A [`SceneRegistry`] only exists in validated form; every constructor
//!   runs the same checks and fails fast on unknown scene ids.
//! - Scene data is immutable for the lifetime of a session.
//! - No portal destination (or the start position) lies inside a trigger
//!   radius of the scene it lands in.

mod builtin;
mod config;
mod params;

pub use builtin::{LOBBY, WORLD};
pub use config::{Obstacle, Portal, SceneConfig, SceneError, SceneRegistry};
pub use params::SimParams;
