use glam::Vec3;
use hubspace_common::SceneId;
use serde::{Deserialize, Serialize};

/// What gets published to the presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub position: Vec3,
    pub scene: SceneId,
    /// Clock reading when the snapshot was taken.
    pub at_ms: u64,
}

/// Time gate for non-urgent broadcasts.
///
/// A snapshot goes out when nothing was sent yet or at least `interval_ms`
/// passed since the last one. Forced snapshots bypass the gate and restart
/// the window.
#[derive(Debug, Clone)]
pub struct PresenceThrottle {
    interval_ms: u64,
    last: Option<PresenceSnapshot>,
}

impl PresenceThrottle {
    /// A gate that has not sent anything yet.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last: None,
        }
    }

    /// Minimum spacing between offered snapshots.
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Last snapshot that went out.
    pub fn last(&self) -> Option<&PresenceSnapshot> {
        self.last.as_ref()
    }

    /// Whether an offer at `now_ms` would go out. A clock reading earlier
    /// than the last send counts as zero elapsed time.
    pub fn is_due(&self, now_ms: u64) -> bool {
        match &self.last {
            None => true,
            Some(last) => now_ms.saturating_sub(last.at_ms) >= self.interval_ms,
        }
    }

    /// Emit `snapshot` if the window has elapsed.
    pub fn offer(&mut self, snapshot: PresenceSnapshot) -> Option<PresenceSnapshot> {
        if !self.is_due(snapshot.at_ms) {
            return None;
        }
        self.last = Some(snapshot.clone());
        Some(snapshot)
    }

    /// Emit `snapshot` unconditionally.
    pub fn force(&mut self, snapshot: PresenceSnapshot) -> PresenceSnapshot {
        self.last = Some(snapshot.clone());
        snapshot
    }
}
