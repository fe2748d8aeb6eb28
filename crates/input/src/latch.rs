use std::sync::atomic::{AtomicU8, Ordering};

use crate::key::{InputState, MoveKey};

/// Latest held-key state, handed from key-event callbacks to the frame loop.
///
/// The four keys are packed into one byte so the frame always reads a
/// consistent snapshot without taking a lock. Only "reflects the most recent
/// key event" is guaranteed.
#[derive(Debug, Default)]
pub struct InputLatch {
    bits: AtomicU8,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: MoveKey) {
        self.bits.fetch_or(key.bit(), Ordering::Release);
    }

    pub fn release(&self, key: MoveKey) {
        self.bits.fetch_and(!key.bit(), Ordering::Release);
    }

    /// Feed a raw key event. Non-movement codes are dropped.
    pub fn key_event(&self, code: &str, down: bool) {
        let Some(key) = MoveKey::from_code(code) else {
            return;
        };
        if down {
            self.press(key);
        } else {
            self.release(key);
        }
    }

    /// Replace the whole state at once (e.g. on focus loss).
    pub fn publish(&self, state: InputState) {
        self.bits.store(state.to_bits(), Ordering::Release);
    }

    pub fn clear(&self) {
        self.bits.store(0, Ordering::Release);
    }

    /// Read the state for this frame.
    pub fn snapshot(&self) -> InputState {
        InputState::from_bits(self.bits.load(Ordering::Acquire))
    }
}
