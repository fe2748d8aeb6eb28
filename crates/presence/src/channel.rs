use glam::Vec3;
use hubspace_common::{ParticipantId, SceneId};
use hubspace_kernel::PresenceSnapshot;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Errors from a presence channel. Callers log these and move on.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("presence channel unavailable: {0}")]
    Unavailable(String),
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// One participant's published state, as stored under their id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub participant: ParticipantId,
    pub position: Vec3,
    pub scene: SceneId,
    pub at_ms: u64,
}

impl PresenceRecord {
    pub fn from_snapshot(participant: ParticipantId, snapshot: &PresenceSnapshot) -> Self {
        Self {
            participant,
            position: snapshot.position,
            scene: snapshot.scene.clone(),
            at_ms: snapshot.at_ms,
        }
    }
}

/// Destination for presence records (a realtime database, a socket, a log).
pub trait PresenceSink {
    fn emit(&mut self, record: &PresenceRecord) -> Result<(), PresenceError>;
}

impl<S: PresenceSink + ?Sized> PresenceSink for Box<S> {
    fn emit(&mut self, record: &PresenceRecord) -> Result<(), PresenceError> {
        (**self).emit(record)
    }
}

/// Writes each record as a line of JSON.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PresenceSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &PresenceRecord) -> Result<(), PresenceError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
