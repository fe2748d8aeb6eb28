use serde::{Deserialize, Serialize};

use crate::pattern::{Pattern, STEPS};
use crate::rng::StepRng;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StudioError {
    #[error("tempo must be a positive finite BPM, got {0}")]
    InvalidTempo(f64),
}

/// Something the synth should play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Kick drum on C1.
    Kick,
    /// Short lead note, as a MIDI note number.
    Lead { midi: u8 },
}

/// All triggers for one sixteenth-note step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// Absolute step count since the transport started.
    pub step: u64,
    /// Seconds since start at which the step falls.
    pub at_secs: f64,
    pub triggers: Vec<Trigger>,
}

/// Nearest MIDI note to a frequency (A4 = 440 Hz = 69).
pub fn frequency_to_midi(hz: f64) -> u8 {
    (69.0 + 12.0 * (hz / 440.0).log2()).round().clamp(0.0, 127.0) as u8
}

/// Tempo-driven sixteenth-note clock over a [`Pattern`].
#[derive(Debug, Clone)]
pub struct Transport {
    bpm: f64,
    pattern: Pattern,
    rng: StepRng,
    running: bool,
    elapsed: f64,
    next_step: u64,
}

impl Transport {
    pub const DEFAULT_BPM: f64 = 130.0;
    pub const LEAD_CHANCE: f64 = 0.15;
    pub const LEAD_LOW_HZ: f64 = 200.0;
    pub const LEAD_SPAN_HZ: f64 = 400.0;

    pub fn new(seed: u64) -> Self {
        let mut rng = StepRng::new(seed);
        let pattern = Pattern::generate(&mut rng);
        Self {
            bpm: Self::DEFAULT_BPM,
            pattern,
            rng,
            running: false,
            elapsed: 0.0,
            next_step: 0,
        }
    }

    pub fn with_bpm(mut self, bpm: f64) -> Result<Self, StudioError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(StudioError::InvalidTempo(bpm));
        }
        self.bpm = bpm;
        Ok(self)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Length of one sixteenth note in seconds.
    pub fn step_secs(&self) -> f64 {
        60.0 / self.bpm / 4.0
    }

    /// Roll a new kick pattern. Takes effect on the next step.
    pub fn regenerate(&mut self) -> &Pattern {
        self.pattern = Pattern::generate(&mut self.rng);
        tracing::debug!(pattern = %self.pattern, "pattern regenerated");
        &self.pattern
    }

    /// Start from the top. The first step falls at time zero.
    pub fn start(&mut self) {
        self.running = true;
        self.elapsed = 0.0;
        self.next_step = 0;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn toggle(&mut self) -> bool {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
        self.running
    }

    /// Move the clock forward and collect every step crossed.
    pub fn advance(&mut self, dt_secs: f64) -> Vec<StepEvent> {
        let mut events = Vec::new();
        if !self.running || !dt_secs.is_finite() || dt_secs < 0.0 {
            return events;
        }
        self.elapsed += dt_secs;
        let step_secs = self.step_secs();
        loop {
            let at_secs = self.next_step as f64 * step_secs;
            if at_secs > self.elapsed {
                break;
            }
            let step = self.next_step;
            self.next_step += 1;
            events.push(StepEvent {
                step,
                at_secs,
                triggers: self.triggers_for(step),
            });
        }
        events
    }

    fn triggers_for(&mut self, step: u64) -> Vec<Trigger> {
        let mut triggers = Vec::new();
        if self.pattern.is_on((step % STEPS as u64) as usize) {
            triggers.push(Trigger::Kick);
        }
        if self.rng.chance(Self::LEAD_CHANCE) {
            let hz = self.rng.next_f64() * Self::LEAD_SPAN_HZ + Self::LEAD_LOW_HZ;
            triggers.push(Trigger::Lead {
                midi: frequency_to_midi(hz),
            });
        }
        triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn midi_mapping() {
        assert_eq!(frequency_to_midi(440.0), 69);
        assert_eq!(frequency_to_midi(261.63), 60);
        assert_eq!(frequency_to_midi(200.0), 55);
        assert_eq!(frequency_to_midi(600.0), 74);
    }

    #[test]
    fn sixteenth_at_130_bpm() {
        let t = Transport::new(0);
        assert!((t.step_secs() - 60.0 / 130.0 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn stopped_transport_is_silent() {
        let mut t = Transport::new(0);
        assert!(t.advance(10.0).is_empty());
    }

    #[test]
    fn first_step_fires_immediately() {
        let mut t = Transport::new(0);
        t.start();
        let events = t.advance(0.0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].step, 0);
    }

    #[test]
    fn one_bar_is_sixteen_steps() {
        let mut t = Transport::new(3);
        t.start();
        let bar = t.step_secs() * 16.0;
        // Just short of the 17th step.
        let events = t.advance(bar - 1e-9);
        assert_eq!(events.len(), 16);
        let kicks = events
            .iter()
            .filter(|e| e.triggers.contains(&Trigger::Kick))
            .count();
        assert_eq!(kicks, t.pattern().hits());
    }

    #[test]
    fn lead_notes_stay_in_range() {
        let mut t = Transport::new(11);
        t.start();
        for e in t.advance(120.0) {
            for trig in e.triggers {
                if let Trigger::Lead { midi } = trig {
                    assert!((55..=74).contains(&midi));
                }
            }
        }
    }

    #[test]
    fn restart_goes_back_to_step_zero() {
        let mut t = Transport::new(5);
        t.start();
        t.advance(1.0);
        assert!(!t.toggle());
        assert!(t.toggle());
        assert_eq!(t.advance(0.0)[0].step, 0);
    }

    #[test]
    fn rejects_bad_tempo() {
        assert_eq!(
            Transport::new(0).with_bpm(0.0).unwrap_err(),
            StudioError::InvalidTempo(0.0)
        );
        assert_eq!(Transport::new(0).with_bpm(90.0).unwrap().bpm(), 90.0);
    }

    proptest! {
        #[test]
        fn slicing_does_not_change_step_count(slices in proptest::collection::vec(0.0f64..0.3, 1..40)) {
            let total: f64 = slices.iter().sum();
            let mut sliced = Transport::new(1);
            sliced.start();
            let steps: Vec<u64> = slices
                .iter()
                .flat_map(|dt| sliced.advance(*dt))
                .map(|e| e.step)
                .collect();
            let n_sliced = steps.len();
            prop_assert!(steps.iter().enumerate().all(|(i, s)| *s == i as u64));

            let mut whole = Transport::new(1);
            whole.start();
            let n_whole = whole.advance(total).len();
            // Float accumulation can straddle one boundary.
            prop_assert!((n_sliced as i64 - n_whole as i64).abs() <= 1);
        }
    }
}
