//! Sample-accurate sixteenth-note clock with swing.

use crate::pattern::STEPS_PER_PATTERN;

/// Samples in one sixteenth note.
pub fn samples_per_step(bpm: f32, sample_rate: f32) -> f64 {
    60.0 / bpm as f64 / 4.0 * sample_rate as f64
}

/// Counts samples down to the next step boundary.
///
/// `tick` is called once per output sample and returns the step that starts
/// on that sample, if any. After a step fires, its length is added to the
/// counter: even steps last `1 + swing` step lengths, odd steps `1 - swing`.
#[derive(Debug, Clone)]
pub struct StepClock {
    samples_per_step: f64,
    counter: f64,
    step: i32,
}

impl StepClock {
    pub fn new(bpm: f32, sample_rate: f32) -> Self {
        Self {
            samples_per_step: samples_per_step(bpm, sample_rate),
            counter: 0.0,
            step: -1,
        }
    }

    pub fn set_tempo(&mut self, bpm: f32, sample_rate: f32) {
        self.samples_per_step = samples_per_step(bpm, sample_rate);
    }

    pub fn samples_per_step(&self) -> f64 {
        self.samples_per_step
    }

    /// Last step fired, or -1 before the first.
    pub fn step(&self) -> i32 {
        self.step
    }

    pub fn counter(&self) -> f64 {
        self.counter
    }

    /// Back to step -1 with an empty counter: step 0 fires on the next tick.
    pub fn reset(&mut self) {
        self.step = -1;
        self.counter = 0.0;
    }

    /// Place the clock at `step` with `counter` samples left in it.
    pub fn set_position(&mut self, step: i32, counter: f64) {
        self.step = step.clamp(-1, STEPS_PER_PATTERN as i32 - 1);
        self.counter = counter.max(0.0);
    }

    /// Align to a musical position given in quarter notes.
    pub fn align_to_ppq(&mut self, ppq: f64) {
        let steps = (ppq / 0.25).max(0.0);
        let whole = steps.floor();
        let frac = steps - whole;
        let step = (whole as i64).rem_euclid(STEPS_PER_PATTERN as i64) as i32;
        if frac < 1e-9 {
            // Exactly on a boundary: that step fires on the next tick.
            self.set_position(step - 1, 0.0);
        } else {
            self.set_position(step, self.samples_per_step * (1.0 - frac));
        }
    }

    /// Advance one sample.
    #[inline]
    pub fn tick(&mut self, swing: f32) -> Option<usize> {
        let mut fired = None;
        if self.counter <= 0.0 {
            self.step = (self.step + 1).rem_euclid(STEPS_PER_PATTERN as i32);
            let swing = swing as f64;
            let factor = if self.step % 2 == 0 {
                1.0 + swing
            } else {
                1.0 - swing
            };
            self.counter += self.samples_per_step * factor;
            fired = Some(self.step as usize);
        }
        self.counter -= 1.0;
        fired
    }
}
