use glam::Vec3;
use hubspace_common::{Aabb, SceneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::params::SimParams;

/// Errors raised while loading or validating scene configuration.
///
/// All of these are fatal: the simulation refuses to start on them.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unsupported scene file extension: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("no scenes configured")]
    Empty,
    #[error("unknown scene {0:?}")]
    UnknownScene(SceneId),
    #[error("portal {portal} in scene {scene:?} leads to unknown scene {target:?}")]
    UnknownPortalTarget {
        scene: SceneId,
        portal: usize,
        target: SceneId,
    },
    #[error("non-finite value in scene {scene:?}: {what}")]
    NonFinite { scene: SceneId, what: String },
    #[error("obstacle {obstacle} in scene {scene:?} has a negative size")]
    NegativeSize { scene: SceneId, obstacle: usize },
    #[error(
        "landing position {position} in scene {scene:?} is inside the trigger radius of portal {portal}"
    )]
    LandsInTrigger {
        scene: SceneId,
        position: Vec3,
        portal: usize,
    },
    #[error("landing position {position} in scene {scene:?} overlaps obstacle {obstacle}")]
    LandsInObstacle {
        scene: SceneId,
        position: Vec3,
        obstacle: usize,
    },
    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),
}

/// A static box the player cannot walk through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec3,
    /// Full extents along each axis.
    pub size: Vec3,
}

impl Obstacle {
    pub fn new(center: Vec3, size: Vec3) -> Self {
        Self { center, size }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }
}

/// A transition zone: walking within the trigger radius of `position`
/// teleports the player to `enter_position` in `target_scene`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub position: Vec3,
    pub target_scene: SceneId,
    pub enter_position: Vec3,
    #[serde(default = "default_portal_color")]
    pub color: String,
}

fn default_portal_color() -> String {
    "#00ffff".into()
}

/// Everything static about one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_ground_color")]
    pub ground_color: String,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub portals: Vec<Portal>,
    /// Obstacle boxes, derived once from `obstacles`.
    #[serde(skip)]
    boxes: Vec<Aabb>,
}

fn default_ground_color() -> String {
    "#228B22".into()
}

impl SceneConfig {
    pub fn new(
        ground_color: impl Into<String>,
        obstacles: Vec<Obstacle>,
        portals: Vec<Portal>,
    ) -> Self {
        let boxes = obstacles.iter().map(Obstacle::aabb).collect();
        Self {
            ground_color: ground_color.into(),
            obstacles,
            portals,
            boxes,
        }
    }

    /// Obstacle volumes used by the collision gate.
    pub fn obstacle_boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    fn rebuild_boxes(&mut self) {
        self.boxes = self.obstacles.iter().map(Obstacle::aabb).collect();
    }
}

/// On-disk form of a registry, before validation.
#[derive(Debug, Deserialize, Serialize)]
struct RegistryFile {
    #[serde(default)]
    params: SimParams,
    start_scene: SceneId,
    start_position: Vec3,
    scenes: BTreeMap<SceneId, SceneConfig>,
}

/// Validated mapping from scene id to its configuration, plus the start
/// scene/position and the simulation parameters.
#[derive(Debug, Clone)]
pub struct SceneRegistry {
    params: SimParams,
    start_scene: SceneId,
    start_position: Vec3,
    scenes: BTreeMap<SceneId, SceneConfig>,
}

impl SceneRegistry {
    /// Build and validate a registry.
    pub fn new(
        params: SimParams,
        start_scene: SceneId,
        start_position: Vec3,
        scenes: BTreeMap<SceneId, SceneConfig>,
    ) -> Result<Self, SceneError> {
        let mut registry = Self {
            params,
            start_scene,
            start_position,
            scenes,
        };
        for scene in registry.scenes.values_mut() {
            scene.rebuild_boxes();
        }
        registry.validate()?;
        tracing::info!(
            scenes = registry.scenes.len(),
            start = %registry.start_scene,
            "scene registry validated"
        );
        Ok(registry)
    }

    pub fn from_json_str(s: &str) -> Result<Self, SceneError> {
        let file: RegistryFile = serde_json::from_str(s)?;
        Self::from_file(file)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, SceneError> {
        let file: RegistryFile = serde_yaml::from_str(s)?;
        Self::from_file(file)
    }

    /// Load a `.json`, `.yaml` or `.yml` scene file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let text = match ext.as_deref() {
            Some("json") | Some("yaml") | Some("yml") => std::fs::read_to_string(path)?,
            _ => return Err(SceneError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), "loading scene file");
        if ext.as_deref() == Some("json") {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    /// Serialize back to pretty JSON, in the same shape `from_json_str` reads.
    pub fn to_json_pretty(&self) -> Result<String, SceneError> {
        let file = RegistryFile {
            params: self.params,
            start_scene: self.start_scene.clone(),
            start_position: self.start_position,
            scenes: self.scenes.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    fn from_file(file: RegistryFile) -> Result<Self, SceneError> {
        Self::new(file.params, file.start_scene, file.start_position, file.scenes)
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn start_scene(&self) -> &SceneId {
        &self.start_scene
    }

    pub fn start_position(&self) -> Vec3 {
        self.start_position
    }

    /// Look up a scene. Unknown ids are a configuration error.
    pub fn get(&self, id: &SceneId) -> Result<&SceneConfig, SceneError> {
        self.scenes
            .get(id)
            .ok_or_else(|| SceneError::UnknownScene(id.clone()))
    }

    pub fn contains(&self, id: &SceneId) -> bool {
        self.scenes.contains_key(id)
    }

    /// Scenes in id order.
    pub fn scenes(&self) -> impl Iterator<Item = (&SceneId, &SceneConfig)> {
        self.scenes.iter()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Run every startup check.
    pub fn validate(&self) -> Result<(), SceneError> {
        self.params.check().map_err(SceneError::InvalidParams)?;
        if self.scenes.is_empty() {
            return Err(SceneError::Empty);
        }

        for (id, scene) in &self.scenes {
            for (i, obstacle) in scene.obstacles.iter().enumerate() {
                if !obstacle.center.is_finite() || !obstacle.size.is_finite() {
                    return Err(SceneError::NonFinite {
                        scene: id.clone(),
                        what: format!("obstacle {i}"),
                    });
                }
                if obstacle.size.min_element() < 0.0 {
                    return Err(SceneError::NegativeSize {
                        scene: id.clone(),
                        obstacle: i,
                    });
                }
            }
            for (i, portal) in scene.portals.iter().enumerate() {
                if !portal.position.is_finite() || !portal.enter_position.is_finite() {
                    return Err(SceneError::NonFinite {
                        scene: id.clone(),
                        what: format!("portal {i}"),
                    });
                }
                if !self.scenes.contains_key(&portal.target_scene) {
                    return Err(SceneError::UnknownPortalTarget {
                        scene: id.clone(),
                        portal: i,
                        target: portal.target_scene.clone(),
                    });
                }
            }
        }

        if !self.start_position.is_finite() {
            return Err(SceneError::NonFinite {
                scene: self.start_scene.clone(),
                what: "start position".into(),
            });
        }
        self.check_landing(&self.start_scene, self.start_position)?;
        for scene in self.scenes.values() {
            for portal in &scene.portals {
                self.check_landing(&portal.target_scene, portal.enter_position)?;
            }
        }
        Ok(())
    }

    /// A landing spot must be clear of obstacles and of every trigger
    /// radius in its scene, otherwise the player would be stuck or bounce
    /// straight back through a portal.
    fn check_landing(&self, scene_id: &SceneId, position: Vec3) -> Result<(), SceneError> {
        let scene = self.get(scene_id)?;
        for (i, portal) in scene.portals.iter().enumerate() {
            if position.distance(portal.position) < self.params.trigger_radius {
                return Err(SceneError::LandsInTrigger {
                    scene: scene_id.clone(),
                    position,
                    portal: i,
                });
            }
        }
        let player = self.params.player_box(position);
        if let Some(i) = scene.boxes.iter().position(|b| b.intersects(&player)) {
            return Err(SceneError::LandsInObstacle {
                scene: scene_id.clone(),
                position,
                obstacle: i,
            });
        }
        Ok(())
    }
}
