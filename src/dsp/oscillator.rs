//! Naive phase-accumulator oscillators.
//!
//! Phase runs in radians over `[0, 2π)`. The voices want the raw, aliasing
//! shapes (the saw is literally `phase / π - 1`), so there is no band-limiting.

use std::f32::consts::{PI, TAU};

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
}

impl Waveform {
    /// Value of the shape at `phase` radians.
    #[inline]
    pub fn at(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Sawtooth => phase / PI - 1.0,
            Waveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Uniform white noise in `[-1, 1)`.
#[inline]
pub fn white_noise(rng: &mut fastrand::Rng) -> f32 {
    rng.f32() * 2.0 - 1.0
}

/// One oscillator: a waveform and its running phase.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    phase: f32,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Oscillator {
            waveform,
            phase: 0.0,
        }
    }

    /// Advance by one sample at `frequency` and return the wrapped phase.
    #[inline]
    pub fn advance(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        self.phase += TAU * frequency / sample_rate;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
        if !(0.0..TAU).contains(&self.phase) {
            self.phase = self.phase.rem_euclid(TAU);
            if self.phase >= TAU {
                self.phase = 0.0;
            }
        }
        self.phase
    }

    /// Advance, then sample the waveform at the new phase.
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let phase = self.advance(frequency, sample_rate);
        self.waveform.at(phase)
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Reset oscillator phase.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
