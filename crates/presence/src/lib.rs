//! Presence: getting the local player's snapshot to everyone else.
//!
//! # Invariants
//! - Broadcasting is best-effort. A failed emit is logged and counted; it
//!   never reaches back into the simulation.
//! - Emission happens off the frame thread; the frame only enqueues.
//! - Records for one participant are delivered in the order they were sent.

pub mod channel;
pub mod chat;
pub mod dispatch;
pub mod room;

pub use channel::{JsonLinesSink, PresenceError, PresenceRecord, PresenceSink};
pub use chat::{ChatError, ChatLog, ChatMessage};
pub use dispatch::{DispatchStats, PresenceDispatcher};
pub use room::{AvatarColor, PresenceEntry, PresenceRoom, avatar_color};
