use hubspace_common::ParticipantId;
use hubspace_kernel::{PresenceSnapshot, TickOutcome};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use crate::channel::{PresenceRecord, PresenceSink};

/// Delivery counters, read at any time from the frame thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchStats {
    /// Records the sink accepted.
    pub sent: u64,
    /// Records the sink rejected.
    pub failed: u64,
    /// Records that never reached the worker.
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn load(&self) -> DispatchStats {
        DispatchStats {
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Fire-and-forget forwarding of presence snapshots to a sink.
///
/// A worker thread owns the sink. The frame thread only pushes onto an
/// unbounded channel, so a slow or failing sink never stalls a tick.
/// Dropping the dispatcher closes the channel and waits for the worker to
/// drain it.
pub struct PresenceDispatcher {
    participant: ParticipantId,
    tx: Option<Sender<PresenceRecord>>,
    worker: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl PresenceDispatcher {
    pub fn spawn<S>(participant: ParticipantId, mut sink: S) -> Self
    where
        S: PresenceSink + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PresenceRecord>();
        let counters = Arc::new(Counters::default());
        let worker_counters = Arc::clone(&counters);
        let worker = std::thread::spawn(move || {
            for record in rx {
                match sink.emit(&record) {
                    Ok(()) => {
                        worker_counters.sent.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(
                            scene = %record.scene,
                            at_ms = record.at_ms,
                            "presence sent"
                        );
                    }
                    Err(e) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            error = %e,
                            scene = %record.scene,
                            "presence broadcast failed"
                        );
                    }
                }
            }
            tracing::debug!("presence worker stopped");
        });
        tracing::debug!(%participant, "presence dispatcher started");
        Self {
            participant,
            tx: Some(tx),
            worker: Some(worker),
            counters,
        }
    }

    pub fn participant(&self) -> ParticipantId {
        self.participant
    }

    /// Forward whatever a tick asked to broadcast.
    pub fn dispatch(&self, outcome: &TickOutcome) {
        if let Some(scene) = &outcome.scene_switched {
            tracing::debug!(%scene, "broadcasting scene switch");
        }
        if let Some(snapshot) = &outcome.presence {
            self.send(snapshot);
        }
    }

    /// Enqueue one snapshot. Never blocks on the sink.
    pub fn send(&self, snapshot: &PresenceSnapshot) {
        let record = PresenceRecord::from_snapshot(self.participant, snapshot);
        let delivered = self
            .tx
            .as_ref()
            .is_some_and(|tx| tx.send(record).is_ok());
        if !delivered {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("presence worker gone, snapshot dropped");
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.load()
    }

    /// Close the channel, wait for queued records, and return final counts.
    pub fn shutdown(mut self) -> DispatchStats {
        self.close();
        self.counters.load()
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("presence worker panicked");
            }
        }
    }
}

impl Drop for PresenceDispatcher {
    fn drop(&mut self) {
        self.close();
    }
}
