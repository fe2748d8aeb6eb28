use glam::Vec3;
use hubspace_common::SceneId;
use hubspace_scene::Portal;

/// A committed scene change.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub portal: usize,
    pub scene: SceneId,
    pub position: Vec3,
}

/// First portal (in list order) whose trigger point is strictly closer than
/// `radius`. Later portals are not considered once one matches.
pub fn find_transition(position: Vec3, portals: &[Portal], radius: f32) -> Option<Transition> {
    portals
        .iter()
        .enumerate()
        .find(|(_, p)| position.distance(p.position) < radius)
        .map(|(i, p)| Transition {
            portal: i,
            scene: p.target_scene.clone(),
            position: p.enter_position,
        })
}
