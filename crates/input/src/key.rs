use serde::{Deserialize, Serialize};

/// A logical movement key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKey {
    Forward,
    Back,
    Left,
    Right,
}

impl MoveKey {
    pub const ALL: [MoveKey; 4] = [MoveKey::Forward, MoveKey::Back, MoveKey::Left, MoveKey::Right];

    /// Map a physical key code (`"KeyW"`, `"ArrowUp"`, ...) to a movement key.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "KeyW" | "ArrowUp" => Some(MoveKey::Forward),
            "KeyS" | "ArrowDown" => Some(MoveKey::Back),
            "KeyA" | "ArrowLeft" => Some(MoveKey::Left),
            "KeyD" | "ArrowRight" => Some(MoveKey::Right),
            _ => None,
        }
    }

    /// Short letter form used on the command line (`w`, `a`, `s`, `d`).
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'w' => Some(MoveKey::Forward),
            's' => Some(MoveKey::Back),
            'a' => Some(MoveKey::Left),
            'd' => Some(MoveKey::Right),
            _ => None,
        }
    }

    pub(crate) fn bit(self) -> u8 {
        match self {
            MoveKey::Forward => 0b0001,
            MoveKey::Back => 0b0010,
            MoveKey::Left => 0b0100,
            MoveKey::Right => 0b1000,
        }
    }
}

/// Snapshot of the held movement keys for one tick.
///
/// Opposite keys held together cancel out in the resolver; nothing here
/// filters them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputState {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a state with the given keys held.
    pub fn holding(keys: &[MoveKey]) -> Self {
        let mut state = Self::default();
        for key in keys {
            state.set(*key, true);
        }
        state
    }

    pub fn set(&mut self, key: MoveKey, held: bool) {
        match key {
            MoveKey::Forward => self.forward = held,
            MoveKey::Back => self.back = held,
            MoveKey::Left => self.left = held,
            MoveKey::Right => self.right = held,
        }
    }

    pub fn is_held(&self, key: MoveKey) -> bool {
        match key {
            MoveKey::Forward => self.forward,
            MoveKey::Back => self.back,
            MoveKey::Left => self.left,
            MoveKey::Right => self.right,
        }
    }

    pub fn any(&self) -> bool {
        self.forward || self.back || self.left || self.right
    }

    /// Apply a raw key event. Returns false when the code is not a movement key.
    pub fn apply_code(&mut self, code: &str, down: bool) -> bool {
        match MoveKey::from_code(code) {
            Some(key) => {
                self.set(key, down);
                true
            }
            None => {
                tracing::trace!(code, "ignoring non-movement key");
                false
            }
        }
    }

    pub(crate) fn to_bits(self) -> u8 {
        MoveKey::ALL
            .iter()
            .filter(|k| self.is_held(**k))
            .fold(0, |bits, k| bits | k.bit())
    }

    pub(crate) fn from_bits(bits: u8) -> Self {
        let mut state = Self::default();
        for key in MoveKey::ALL {
            state.set(key, bits & key.bit() != 0);
        }
        state
    }
}
