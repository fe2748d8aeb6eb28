use glam::Vec3;
use hubspace_common::{ParticipantId, SceneId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::channel::{PresenceError, PresenceRecord, PresenceSink};

/// Latest known state of one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceEntry {
    pub position: Vec3,
    pub scene: SceneId,
    pub at_ms: u64,
}

/// Shared in-memory presence table, keyed by participant.
///
/// Clones share the same table, so one handle can be given to each client's
/// dispatcher while the renderer reads from another.
#[derive(Debug, Clone, Default)]
pub struct PresenceRoom {
    users: Arc<Mutex<BTreeMap<ParticipantId, PresenceEntry>>>,
}

impl PresenceRoom {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<ParticipantId, PresenceEntry>>, PresenceError> {
        self.users
            .lock()
            .map_err(|_| PresenceError::Unavailable("presence table poisoned".into()))
    }

    pub fn get(&self, id: &ParticipantId) -> Option<PresenceEntry> {
        self.lock().ok()?.get(id).cloned()
    }

    /// Remove a participant (disconnect).
    pub fn leave(&self, id: &ParticipantId) -> Option<PresenceEntry> {
        self.lock().ok()?.remove(id)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|u| u.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Everyone in `scene` except `viewer`, in id order. These are the
    /// avatars a client in that scene draws.
    pub fn participants_in(
        &self,
        scene: &SceneId,
        viewer: Option<&ParticipantId>,
    ) -> Vec<(ParticipantId, PresenceEntry)> {
        let Ok(users) = self.lock() else {
            return Vec::new();
        };
        users
            .iter()
            .filter(|(id, e)| &e.scene == scene && Some(*id) != viewer)
            .map(|(id, e)| (*id, e.clone()))
            .collect()
    }
}

impl PresenceSink for PresenceRoom {
    fn emit(&mut self, record: &PresenceRecord) -> Result<(), PresenceError> {
        self.lock()?.insert(
            record.participant,
            PresenceEntry {
                position: record.position,
                scene: record.scene.clone(),
                at_ms: record.at_ms,
            },
        );
        Ok(())
    }
}

/// Avatar tint in HSL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarColor {
    pub hue: u16,
    pub saturation: u8,
    pub lightness: u8,
}

impl fmt::Display for AvatarColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

/// Stable color for a participant, so everyone sees the same tint.
///
/// The string hash `c + (h << 5) - h` wraps to 32 bits at every step. Clients
/// that keep the running sum unwrapped get a different hue for long ids, so
/// all peers in one room must share this function.
pub fn avatar_color(id: &ParticipantId) -> AvatarColor {
    let hash = id
        .to_string()
        .chars()
        .fold(0i32, |h, c| (c as i32).wrapping_add(h.wrapping_shl(5).wrapping_sub(h)));
    AvatarColor {
        hue: hash.rem_euclid(360) as u16,
        saturation: 70,
        lightness: 50,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record(id: ParticipantId, scene: &str, x: f32, at_ms: u64) -> PresenceRecord {
        PresenceRecord {
            participant: id,
            position: Vec3::new(x, 1.7, 0.0),
            scene: scene.into(),
            at_ms,
        }
    }

    #[test]
    fn latest_record_wins() {
        let mut room = PresenceRoom::new();
        let id = ParticipantId::new();
        room.emit(&record(id, "world", 1.0, 0)).unwrap();
        room.emit(&record(id, "world", 2.0, 100)).unwrap();
        assert_eq!(room.len(), 1);
        assert_eq!(room.get(&id).unwrap().position.x, 2.0);
    }

    #[test]
    fn participants_filtered_by_scene_and_viewer() {
        let mut room = PresenceRoom::new();
        let me = ParticipantId::new();
        let friend = ParticipantId::new();
        let elsewhere = ParticipantId::new();
        room.emit(&record(me, "world", 0.0, 0)).unwrap();
        room.emit(&record(friend, "world", 3.0, 0)).unwrap();
        room.emit(&record(elsewhere, "lobby", 0.0, 0)).unwrap();

        let seen = room.participants_in(&"world".into(), Some(&me));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, friend);

        let all_world = room.participants_in(&"world".into(), None);
        assert_eq!(all_world.len(), 2);
    }

    #[test]
    fn clones_share_the_table() {
        let mut writer = PresenceRoom::new();
        let reader = writer.clone();
        let id = ParticipantId::new();
        writer.emit(&record(id, "lobby", 0.0, 0)).unwrap();
        assert!(reader.get(&id).is_some());
        assert!(reader.leave(&id).is_some());
        assert!(writer.is_empty());
    }

    #[test]
    fn avatar_color_is_stable_and_in_range() {
        let id = ParticipantId(Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0));
        let a = avatar_color(&id);
        assert_eq!(a, avatar_color(&id));
        assert!(a.hue < 360);
        assert!(a.to_string().starts_with("hsl("));
        assert!(a.to_string().ends_with(", 70%, 50%)"));
    }

    #[test]
    fn avatar_hash_wraps_to_32_bits() {
        // Unwrapped, this id would land on hue 40.
        let id = ParticipantId(Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0));
        assert_eq!(avatar_color(&id).hue, 144);
        assert_eq!(avatar_color(&id).to_string(), "hsl(144, 70%, 50%)");
    }
}
