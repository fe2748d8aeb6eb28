//! Movement resolver: held keys + facing yaw to a collision-gated step.

use glam::{Quat, Vec3};
use hubspace_common::Aabb;
use hubspace_input::InputState;
use hubspace_scene::SimParams;

/// Anything the player volume can be tested against.
pub trait Collider {
    /// True if `volume` overlaps any solid part of the collider.
    fn collides(&self, volume: &Aabb) -> bool;
}

impl Collider for [Aabb] {
    fn collides(&self, volume: &Aabb) -> bool {
        self.iter().any(|b| b.intersects(volume))
    }
}

impl Collider for Vec<Aabb> {
    fn collides(&self, volume: &Aabb) -> bool {
        self.as_slice().collides(volume)
    }
}

/// Inputs of one movement step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub position: Vec3,
    /// Facing yaw in radians; 0 looks down -Z.
    pub yaw: f32,
    pub input: InputState,
    /// Seconds since the previous tick.
    pub dt: f32,
}

/// Result of one movement step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveOutcome {
    /// Nothing to do: no keys, cancelling keys, or no elapsed time.
    Idle,
    /// The candidate was clear and is the new position.
    Moved(Vec3),
    /// The candidate overlapped an obstacle and was discarded.
    Blocked { candidate: Vec3 },
}

/// Horizontal forward and right unit vectors for a yaw angle.
///
/// World forward is -Z and right is +X, both rotated about +Y. The vertical
/// component is dropped before normalizing so pitch never leaks into motion.
pub fn planar_basis(yaw: f32) -> (Vec3, Vec3) {
    let rotation = Quat::from_rotation_y(yaw);
    let flatten = |v: Vec3| Vec3::new(v.x, 0.0, v.z).normalize_or_zero();
    (flatten(rotation * Vec3::NEG_Z), flatten(rotation * Vec3::X))
}

/// Displacement for one tick. Opposite keys cancel exactly.
pub fn displacement(yaw: f32, input: &InputState, speed: f32, dt: f32) -> Vec3 {
    let (forward, right) = planar_basis(yaw);
    let step = speed * dt;
    let mut d = Vec3::ZERO;
    if input.forward {
        d += forward * step;
    }
    if input.back {
        d -= forward * step;
    }
    if input.right {
        d += right * step;
    }
    if input.left {
        d -= right * step;
    }
    d
}

/// Resolve one step. All-or-nothing: any overlap rejects the whole move,
/// there is no sliding along walls.
pub fn resolve_move<C: Collider + ?Sized>(
    request: &MoveRequest,
    params: &SimParams,
    colliders: &C,
) -> MoveOutcome {
    if !request.dt.is_finite() || request.dt <= 0.0 {
        return MoveOutcome::Idle;
    }
    let d = displacement(request.yaw, &request.input, params.speed, request.dt);
    if d.length_squared() == 0.0 {
        return MoveOutcome::Idle;
    }

    let mut candidate = request.position + d;
    candidate.y = params.eye_height;

    if colliders.collides(&params.player_box(candidate)) {
        MoveOutcome::Blocked { candidate }
    } else {
        MoveOutcome::Moved(candidate)
    }
}
