use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rng::StepRng;

pub const STEPS: usize = 16;

/// Which of the sixteen steps trigger the kick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern {
    steps: [bool; STEPS],
}

impl Pattern {
    pub const DENSITY: f64 = 0.25;

    pub fn from_steps(steps: [bool; STEPS]) -> Self {
        Self { steps }
    }

    /// Roll a fresh pattern; each step is on with probability [`Self::DENSITY`].
    pub fn generate(rng: &mut StepRng) -> Self {
        let mut steps = [false; STEPS];
        for s in &mut steps {
            *s = rng.chance(Self::DENSITY);
        }
        Self { steps }
    }

    pub fn is_on(&self, step: usize) -> bool {
        self.steps[step % STEPS]
    }

    pub fn hits(&self) -> usize {
        self.steps.iter().filter(|s| **s).count()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, on) in self.steps.iter().enumerate() {
            if i > 0 && i % 4 == 0 {
                f.write_str(" ")?;
            }
            f.write_str(if *on { "x" } else { "." })?;
        }
        Ok(())
    }
}
