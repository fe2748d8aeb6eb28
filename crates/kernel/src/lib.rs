//! Simulation kernel: the per-frame movement, collision, portal and
//! presence chain for the local player.
//!
//! # Invariants
//! - [`Session::tick`] is pure with respect to its inputs: same position,
//!   yaw, keys, dt, clock reading and scene data give the same result.
//! - The kernel performs no I/O. Broadcasts and scene switches come back as
//!   signals in [`TickOutcome`] for the host to dispatch.
//! - A rejected move leaves the position bit-for-bit unchanged.

pub mod clock;
pub mod movement;
pub mod portal;
pub mod session;
pub mod throttle;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use movement::{Collider, MoveOutcome, MoveRequest, resolve_move};
pub use portal::{Transition, find_transition};
pub use session::{MotionState, Session, SimEvent, TickOutcome};
pub use throttle::{PresenceSnapshot, PresenceThrottle};
