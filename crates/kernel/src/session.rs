use glam::Vec3;
use hubspace_common::SceneId;
use hubspace_input::InputState;
use hubspace_scene::{SceneError, SceneRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::movement::{MoveOutcome, MoveRequest, resolve_move};
use crate::portal::find_transition;
use crate::throttle::{PresenceSnapshot, PresenceThrottle};

/// Where the local player is in the Idle/Moving/Blocked/Transitioning cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Idle,
    Moving,
    Blocked,
    Transitioning,
}

/// A record of every change to the local player's state.
///
/// Replaying the log over the same registry reproduces position and scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A step was committed.
    Moved { from: Vec3, to: Vec3 },
    /// A step was rejected by an obstacle. Position did not change.
    Blocked { at: Vec3, candidate: Vec3 },
    /// A portal fired.
    Transitioned {
        from_scene: SceneId,
        to_scene: SceneId,
        position: Vec3,
    },
}

/// Signals produced by one tick, for the host loop to dispatch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickOutcome {
    pub state: MotionState,
    /// Snapshot to hand to the presence channel, if one is due.
    pub presence: Option<PresenceSnapshot>,
    /// New active scene, if a portal fired this tick.
    pub scene_switched: Option<SceneId>,
}

impl TickOutcome {
    fn quiet(state: MotionState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

/// Authoritative local simulation state for one client.
///
/// The session owns the player's position and active scene. Everything it
/// would do to the outside world is returned from [`Session::tick`].
///
/// The event log is off by default. A host that wants replay turns it on
/// with [`Session::recording`] and drains it each frame or at a checkpoint.
#[derive(Debug, Clone)]
pub struct Session {
    registry: Arc<SceneRegistry>,
    scene: SceneId,
    position: Vec3,
    state: MotionState,
    throttle: PresenceThrottle,
    ticks: u64,
    recording: bool,
    events: Vec<SimEvent>,
}

impl Session {
    /// Start at the registry's configured scene and position.
    pub fn new(registry: Arc<SceneRegistry>) -> Result<Self, SceneError> {
        let scene = registry.start_scene().clone();
        let position = registry.start_position();
        Self::starting_at(registry, scene, position)
    }

    /// Start in a specific scene. Unknown scenes are refused.
    pub fn starting_at(
        registry: Arc<SceneRegistry>,
        scene: SceneId,
        position: Vec3,
    ) -> Result<Self, SceneError> {
        registry.get(&scene)?;
        let throttle = PresenceThrottle::new(registry.params().broadcast_interval_ms);
        tracing::info!(%scene, ?position, "session started");
        Ok(Self {
            registry,
            scene,
            position,
            state: MotionState::Idle,
            throttle,
            ticks: 0,
            recording: false,
            events: Vec::new(),
        })
    }

    /// Keep a [`SimEvent`] for every state change until the host drains it.
    pub fn recording(mut self) -> Self {
        self.recording = true;
        self
    }

    /// Whether state changes are being logged.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Current eye position, for the camera to follow.
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// The one active scene.
    pub fn scene(&self) -> &SceneId {
        &self.scene
    }

    /// Motion state after the most recent tick.
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Number of ticks evaluated so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Scene data this session runs against.
    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    /// Last snapshot handed out for broadcast.
    pub fn last_broadcast(&self) -> Option<&PresenceSnapshot> {
        self.throttle.last()
    }

    /// Events recorded since the last drain. Always empty unless recording.
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance one frame.
    ///
    /// Order: movement, collision gate, commit, portal check, presence gate.
    /// Idle and blocked ticks never produce a broadcast. A portal transition
    /// always produces one, regardless of the throttle.
    pub fn tick(&mut self, input: &InputState, yaw: f32, dt: f32, now_ms: u64) -> TickOutcome {
        let _span = tracing::trace_span!("tick", n = self.ticks).entered();
        self.ticks += 1;

        let registry = Arc::clone(&self.registry);
        let params = registry.params();
        let Ok(config) = registry.get(&self.scene) else {
            tracing::error!(scene = %self.scene, "active scene missing from registry");
            self.state = MotionState::Idle;
            return TickOutcome::quiet(MotionState::Idle);
        };

        let request = MoveRequest {
            position: self.position,
            yaw,
            input: *input,
            dt,
        };
        match resolve_move(&request, params, config.obstacle_boxes()) {
            MoveOutcome::Idle => {
                self.state = MotionState::Idle;
                return TickOutcome::quiet(MotionState::Idle);
            }
            MoveOutcome::Blocked { candidate } => {
                tracing::debug!(at = ?self.position, ?candidate, "move blocked");
                self.record(SimEvent::Blocked {
                    at: self.position,
                    candidate,
                });
                self.state = MotionState::Blocked;
                return TickOutcome::quiet(MotionState::Blocked);
            }
            MoveOutcome::Moved(to) => {
                self.record(SimEvent::Moved {
                    from: self.position,
                    to,
                });
                self.position = to;
            }
        }

        let portal = find_transition(self.position, &config.portals, params.trigger_radius);
        if let Some(transition) = portal {
            let from_scene = std::mem::replace(&mut self.scene, transition.scene.clone());
            self.position = transition.position;
            self.state = MotionState::Transitioning;
            tracing::info!(
                from = %from_scene,
                to = %self.scene,
                portal = transition.portal,
                "portal transition"
            );
            self.record(SimEvent::Transitioned {
                from_scene,
                to_scene: self.scene.clone(),
                position: self.position,
            });
            let snapshot = self.snapshot(now_ms);
            let snapshot = self.throttle.force(snapshot);
            return TickOutcome {
                state: MotionState::Transitioning,
                presence: Some(snapshot),
                scene_switched: Some(transition.scene),
            };
        }

        self.state = MotionState::Moving;
        let snapshot = self.snapshot(now_ms);
        TickOutcome {
            state: MotionState::Moving,
            presence: self.throttle.offer(snapshot),
            scene_switched: None,
        }
    }

    fn record(&mut self, event: SimEvent) {
        if self.recording {
            self.events.push(event);
        }
    }

    fn snapshot(&self, now_ms: u64) -> PresenceSnapshot {
        PresenceSnapshot {
            position: self.position,
            scene: self.scene.clone(),
            at_ms: now_ms,
        }
    }

    /// Rebuild a session from an event log over the same registry.
    pub fn replay(registry: Arc<SceneRegistry>, events: &[SimEvent]) -> Result<Self, SceneError> {
        let mut session = Self::new(registry)?;
        for event in events {
            match event {
                SimEvent::Moved { to, .. } => session.position = *to,
                SimEvent::Blocked { .. } => {}
                SimEvent::Transitioned {
                    to_scene, position, ..
                } => {
                    session.registry.get(to_scene)?;
                    session.scene = to_scene.clone();
                    session.position = *position;
                }
            }
        }
        Ok(session)
    }

    /// FNV-1a over the scene id and the exact position bits.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mut mix = |bytes: &[u8]| {
            for &b in bytes {
                h ^= b as u64;
                h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(self.scene.as_str().as_bytes());
        mix(&self.position.x.to_bits().to_le_bytes());
        mix(&self.position.y.to_bits().to_le_bytes());
        mix(&self.position.z.to_bits().to_le_bytes());
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hubspace_input::MoveKey;
    use hubspace_scene::{LOBBY, Obstacle, Portal, SceneConfig, SimParams, WORLD};
    use std::collections::BTreeMap;
    use std::f32::consts::PI;

    const FACING_PLUS_Z: f32 = PI;

    fn builtin() -> Arc<SceneRegistry> {
        Arc::new(SceneRegistry::builtin().unwrap())
    }

    fn forward() -> InputState {
        InputState::holding(&[MoveKey::Forward])
    }

    /// One scene with a single building at (10, 5, 10), half extents 5.
    fn block_registry(speed: f32) -> Arc<SceneRegistry> {
        let mut scenes = BTreeMap::new();
        scenes.insert(
            SceneId::from("block"),
            SceneConfig::new(
                "#444",
                vec![Obstacle::new(Vec3::new(10.0, 5.0, 10.0), Vec3::splat(10.0))],
                vec![],
            ),
        );
        let params = SimParams {
            speed,
            ..SimParams::default()
        };
        Arc::new(
            SceneRegistry::new(params, "block".into(), Vec3::new(9.5, 1.7, 0.0), scenes).unwrap(),
        )
    }

    #[test]
    fn starts_idle_at_configured_spawn() {
        let s = Session::new(builtin()).unwrap();
        assert_eq!(s.scene().as_str(), WORLD);
        assert_eq!(s.position(), Vec3::new(0.0, 1.7, 0.0));
        assert_eq!(s.state(), MotionState::Idle);
        assert!(s.last_broadcast().is_none());
    }

    #[test]
    fn refuses_unknown_start_scene() {
        let err = Session::starting_at(builtin(), "attic".into(), Vec3::ZERO).unwrap_err();
        assert!(matches!(err, SceneError::UnknownScene(_)));
    }

    #[test]
    fn forward_step_moves_and_broadcasts_first_time() {
        let mut s = Session::new(builtin()).unwrap();
        let out = s.tick(&forward(), 0.0, 0.1, 1_000);
        assert_eq!(out.state, MotionState::Moving);
        assert!((s.position() - Vec3::new(0.0, 1.7, -1.5)).length() < 1e-5);
        let snap = out.presence.unwrap();
        assert_eq!(snap.position, s.position());
        assert_eq!(snap.scene.as_str(), WORLD);
        assert!(out.scene_switched.is_none());
    }

    #[test]
    fn idle_tick_changes_nothing_and_broadcasts_nothing() {
        let mut s = Session::new(builtin()).unwrap();
        let before = s.position();
        let out = s.tick(&InputState::none(), 1.3, 0.1, 0);
        assert_eq!(out, TickOutcome::quiet(MotionState::Idle));
        assert_eq!(s.position(), before);
        assert!(s.events().is_empty());
    }

    #[test]
    fn cancelling_keys_do_not_broadcast() {
        let mut s = Session::new(builtin()).unwrap();
        let keys = InputState::holding(&[MoveKey::Forward, MoveKey::Back]);
        let out = s.tick(&keys, 0.0, 0.1, 0);
        assert_eq!(out.state, MotionState::Idle);
        assert!(out.presence.is_none());
        assert!(s.last_broadcast().is_none());
    }

    #[test]
    fn blocked_move_keeps_exact_position_and_is_silent() {
        let mut s = Session::new(block_registry(50.0)).unwrap().recording();
        let before = s.position();
        let out = s.tick(&forward(), FACING_PLUS_Z, 0.1, 0);
        assert_eq!(out.state, MotionState::Blocked);
        assert!(out.presence.is_none());
        assert_eq!(s.position().x.to_bits(), before.x.to_bits());
        assert_eq!(s.position().y.to_bits(), before.y.to_bits());
        assert_eq!(s.position().z.to_bits(), before.z.to_bits());
        assert_eq!(s.position(), Vec3::new(9.5, 1.7, 0.0));
        assert!(matches!(s.events()[0], SimEvent::Blocked { .. }));
    }

    #[test]
    fn moves_within_window_broadcast_once() {
        let mut s = Session::new(builtin()).unwrap();
        let sent = [0, 50]
            .into_iter()
            .filter_map(|t| s.tick(&forward(), 0.0, 0.016, t).presence)
            .count();
        assert_eq!(sent, 1);
    }

    #[test]
    fn moves_beyond_window_broadcast_twice() {
        let mut s = Session::new(builtin()).unwrap();
        let sent = [0, 101]
            .into_iter()
            .filter_map(|t| s.tick(&forward(), 0.0, 0.016, t).presence)
            .count();
        assert_eq!(sent, 2);
    }

    #[test]
    fn walking_into_the_world_portal_switches_to_lobby() {
        let reg = builtin();
        // Two units short of the trigger radius around (0, 2, 15), facing it.
        let mut s = Session::starting_at(reg, WORLD.into(), Vec3::new(0.0, 1.7, 11.0)).unwrap();
        // Prime the throttle so a normal broadcast would be suppressed.
        s.tick(&forward(), FACING_PLUS_Z, 0.01, 1_000);
        let out = s.tick(&forward(), FACING_PLUS_Z, 0.1, 1_010);

        assert_eq!(out.state, MotionState::Transitioning);
        assert_eq!(out.scene_switched.as_ref().unwrap().as_str(), LOBBY);
        assert_eq!(s.scene().as_str(), LOBBY);
        assert_eq!(s.position(), Vec3::new(0.0, 1.7, -8.0));
        let snap = out.presence.unwrap();
        assert_eq!(snap.scene.as_str(), LOBBY);
        assert_eq!(snap.position, Vec3::new(0.0, 1.7, -8.0));
        assert_eq!(snap.at_ms, 1_010);
    }

    #[test]
    fn no_immediate_bounce_back_after_transition() {
        let mut s =
            Session::starting_at(builtin(), WORLD.into(), Vec3::new(0.0, 1.7, 11.0)).unwrap();
        s.tick(&forward(), FACING_PLUS_Z, 0.2, 0);
        assert_eq!(s.scene().as_str(), LOBBY);
        // A small step in the lobby stays in the lobby.
        let out = s.tick(&forward(), 0.0, 0.016, 500);
        assert_eq!(out.state, MotionState::Moving);
        assert!(out.scene_switched.is_none());
        assert_eq!(s.scene().as_str(), LOBBY);
    }

    #[test]
    fn first_portal_in_list_wins() {
        let mut scenes = BTreeMap::new();
        let portal = |target: &str, z: f32| Portal {
            position: Vec3::new(0.0, 1.7, z),
            target_scene: target.into(),
            enter_position: Vec3::new(0.0, 1.7, 0.0),
            color: "#fff".into(),
        };
        scenes.insert(
            SceneId::from("hub"),
            SceneConfig::new("#000", vec![], vec![portal("a", -3.0), portal("b", -3.5)]),
        );
        scenes.insert(SceneId::from("a"), SceneConfig::new("#000", vec![], vec![]));
        scenes.insert(SceneId::from("b"), SceneConfig::new("#000", vec![], vec![]));
        let reg = SceneRegistry::new(
            SimParams::default(),
            "hub".into(),
            Vec3::new(0.0, 1.7, 0.0),
            scenes,
        )
        .unwrap();
        let mut s = Session::new(Arc::new(reg)).unwrap();
        // One step to z = -1.5 is within 2.5 of both portals.
        let out = s.tick(&forward(), 0.0, 0.1, 0);
        assert_eq!(out.scene_switched.unwrap().as_str(), "a");
    }

    #[test]
    fn state_cycle_idle_moving_blocked_idle() {
        let mut s = Session::new(block_registry(15.0)).unwrap();
        assert_eq!(s.tick(&InputState::none(), 0.0, 0.1, 0).state, MotionState::Idle);
        // Facing -Z, away from the building.
        assert_eq!(s.tick(&forward(), 0.0, 0.1, 10).state, MotionState::Moving);
        // Facing +X: x goes from 9.5 to 11 at z = -1.5; the building starts at z = 5.
        assert_eq!(
            s.tick(&forward(), -std::f32::consts::FRAC_PI_2, 0.1, 20).state,
            MotionState::Moving
        );
        // Now facing +Z with a big step straight into it.
        assert_eq!(s.tick(&forward(), FACING_PLUS_Z, 0.5, 30).state, MotionState::Blocked);
        assert_eq!(s.state(), MotionState::Blocked);
        assert_eq!(s.tick(&InputState::none(), 0.0, 0.1, 40).state, MotionState::Idle);
    }

    #[test]
    fn replay_reproduces_state() {
        let reg = builtin();
        let mut s = Session::starting_at(Arc::clone(&reg), WORLD.into(), Vec3::new(0.0, 1.7, 11.0))
            .unwrap()
            .recording();
        let mut events = vec![SimEvent::Moved {
            from: Vec3::new(0.0, 1.7, 0.0),
            to: Vec3::new(0.0, 1.7, 11.0),
        }];
        for i in 0..5 {
            s.tick(&forward(), FACING_PLUS_Z, 0.1, i * 16);
        }
        s.tick(&InputState::holding(&[MoveKey::Right]), 0.3, 0.2, 200);
        events.extend(s.drain_events());

        let replayed = Session::replay(reg, &events).unwrap();
        assert_eq!(replayed.scene(), s.scene());
        assert_eq!(replayed.state_hash(), s.state_hash());
    }

    #[test]
    fn identical_inputs_give_identical_hashes() {
        let run = || {
            let mut s = Session::new(builtin()).unwrap();
            for i in 0..120u64 {
                let yaw = (i as f32) * 0.05;
                s.tick(&forward(), yaw, 1.0 / 60.0, i * 16);
            }
            s.state_hash()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn long_walk_without_recording_keeps_no_log() {
        let mut s = Session::new(builtin()).unwrap();
        let keys = InputState::holding(&[MoveKey::Forward, MoveKey::Right]);
        // Ten minutes at 60 fps, circling so some ticks hit buildings.
        for i in 0..36_000u64 {
            s.tick(&keys, i as f32 * 0.01, 1.0 / 60.0, i * 16);
        }
        assert_eq!(s.ticks(), 36_000);
        assert!(!s.is_recording());
        assert!(s.events().is_empty());
    }

    #[test]
    fn draining_each_frame_bounds_the_log_and_still_replays() {
        let reg = builtin();
        let mut s = Session::new(Arc::clone(&reg)).unwrap().recording();
        assert!(s.is_recording());
        let keys = InputState::holding(&[MoveKey::Forward, MoveKey::Right]);
        let mut kept = Vec::new();
        for i in 0..36_000u64 {
            s.tick(&keys, i as f32 * 0.01, 1.0 / 60.0, i * 16);
            assert!(s.events().len() <= 2);
            kept.extend(s.drain_events());
        }
        assert!(s.events().is_empty());
        let replayed = Session::replay(reg, &kept).unwrap();
        assert_eq!(replayed.state_hash(), s.state_hash());
    }
}
