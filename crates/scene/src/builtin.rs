//! The default two-scene world: an open city block and an enclosed lobby.

use glam::Vec3;
use hubspace_common::SceneId;
use std::collections::BTreeMap;

use crate::config::{Obstacle, Portal, SceneConfig, SceneError, SceneRegistry};
use crate::params::SimParams;

pub const WORLD: &str = "world";
pub const LOBBY: &str = "lobby";

fn building(x: f32, y: f32, z: f32, w: f32, h: f32, d: f32) -> Obstacle {
    Obstacle::new(Vec3::new(x, y, z), Vec3::new(w, h, d))
}

fn world_scene(eye: f32) -> SceneConfig {
    SceneConfig::new(
        "#228B22",
        vec![
            building(-20.0, 5.0, -20.0, 10.0, 10.0, 10.0),
            building(20.0, 4.0, -10.0, 8.0, 8.0, 8.0),
            building(0.0, 6.0, 30.0, 12.0, 12.0, 12.0),
            building(-30.0, 3.0, 20.0, 6.0, 6.0, 6.0),
            building(25.0, 7.0, 0.0, 10.0, 14.0, 10.0),
            building(-10.0, 4.0, -30.0, 7.0, 8.0, 7.0),
            building(35.0, 5.0, 25.0, 9.0, 10.0, 9.0),
            building(-25.0, 3.0, -10.0, 5.0, 6.0, 5.0),
        ],
        vec![Portal {
            position: Vec3::new(0.0, 2.0, 15.0),
            target_scene: SceneId::from(LOBBY),
            enter_position: Vec3::new(0.0, eye, -8.0),
            color: "#00ffff".into(),
        }],
    )
}

fn lobby_scene(eye: f32) -> SceneConfig {
    SceneConfig::new(
        "#333333",
        vec![
            // walls
            building(0.0, 5.0, -10.0, 20.0, 10.0, 1.0),
            building(0.0, 5.0, 10.0, 20.0, 10.0, 1.0),
            building(-10.0, 5.0, 0.0, 1.0, 10.0, 20.0),
            building(10.0, 5.0, 0.0, 1.0, 10.0, 20.0),
            // roof
            building(0.0, 10.0, 0.0, 20.0, 1.0, 20.0),
            // pillars
            building(-4.0, 3.0, -4.0, 1.0, 6.0, 1.0),
            building(4.0, 3.0, 4.0, 1.0, 6.0, 1.0),
        ],
        // Inside the walls, at the far end from where players arrive.
        vec![Portal {
            position: Vec3::new(0.0, 2.0, 7.0),
            target_scene: SceneId::from(WORLD),
            enter_position: Vec3::new(0.0, eye, 8.0),
            color: "#ff00ff".into(),
        }],
    )
}

impl SceneRegistry {
    /// The built-in city + lobby pair, starting at the world origin.
    ///
    /// Goes through the same validation as a loaded scene file.
    pub fn builtin() -> Result<Self, SceneError> {
        let params = SimParams::default();
        let eye = params.eye_height;
        let mut scenes = BTreeMap::new();
        scenes.insert(SceneId::from(WORLD), world_scene(eye));
        scenes.insert(SceneId::from(LOBBY), lobby_scene(eye));
        Self::new(params, SceneId::from(WORLD), Vec3::new(0.0, eye, 0.0), scenes)
    }
}
