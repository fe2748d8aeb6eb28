use glam::Vec3;
use hubspace_common::Aabb;
use serde::{Deserialize, Serialize};

/// Tunable constants of the local simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Walking speed in units per second.
    pub speed: f32,
    /// Fixed camera height; movement is planar at this elevation.
    pub eye_height: f32,
    /// Half width and half depth of the player volume.
    pub player_half_width: f32,
    /// Distance below which a portal fires.
    pub trigger_radius: f32,
    /// Minimum spacing between non-urgent presence broadcasts.
    pub broadcast_interval_ms: u64,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            speed: 15.0,
            eye_height: 1.7,
            player_half_width: 0.4,
            trigger_radius: 2.5,
            broadcast_interval_ms: 100,
        }
    }
}

impl SimParams {
    /// Player volume centered on `position`: the full eye height tall.
    pub fn player_box(&self, position: Vec3) -> Aabb {
        Aabb::from_center_half_extents(
            position,
            Vec3::new(
                self.player_half_width,
                self.eye_height * 0.5,
                self.player_half_width,
            ),
        )
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        let positive = [
            ("speed", self.speed),
            ("eye_height", self.eye_height),
            ("player_half_width", self.player_half_width),
            ("trigger_radius", self.trigger_radius),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive finite number, got {value}"));
            }
        }
        Ok(())
    }
}
