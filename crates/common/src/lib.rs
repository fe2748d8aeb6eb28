//! Shared types used across the hubspace crates.
//!
//! # Invariants
//! - Box intersection is symmetric and uses strict comparisons on every axis.
//! - Ids are plain values; no crate here owns mutable state.

pub mod aabb;
pub mod types;

pub use aabb::{Aabb, intersects};
pub use types::{ParticipantId, SceneId};
