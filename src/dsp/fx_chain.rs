//! The master effects chain: low-pass → soft clip → delay → reverb →
//! compressor, always in that order, one sample at a time.
//!
//! Stage state runs continuously across the session. Parameters are clamped
//! when they are set, so `process` never sees an out-of-range value.

use serde::{Deserialize, Serialize};

use super::compressor::Compressor;
use super::delay::Delay;
use super::filter::{OnePoleLowpass, one_pole_coefficient};
use super::mixer::soft_clip;
use super::reverb::Reverb;

/// Plain-value settings for the chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxParams {
    pub cutoff: f32,
    pub drive: f32,
    pub delay_mix: f32,
    pub delay_feedback: f32,
    pub reverb: f32,
}

impl Default for FxParams {
    fn default() -> Self {
        Self {
            cutoff: 8000.0,
            drive: 1.4,
            delay_mix: 0.35,
            delay_feedback: 0.42,
            reverb: 0.40,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FxChain {
    sample_rate: f32,
    cutoff: f32,
    lowpass_coef: f32,
    drive: f32,
    lowpass: OnePoleLowpass,
    delay: Delay,
    reverb: Reverb,
    compressor: Compressor,
}

impl FxChain {
    pub fn new(sample_rate: f32, bpm: f32) -> Self {
        let mut chain = Self {
            sample_rate,
            cutoff: 0.0,
            lowpass_coef: 1.0,
            drive: 1.0,
            lowpass: OnePoleLowpass::default(),
            delay: Delay::new(sample_rate),
            reverb: Reverb::new(sample_rate),
            compressor: Compressor::new(sample_rate),
        };
        chain.set_bpm(bpm);
        chain.set_params(&FxParams::default());
        chain
    }

    pub fn set_params(&mut self, params: &FxParams) {
        self.set_cutoff(params.cutoff);
        self.drive = params.drive.clamp(0.5, 10.0);
        self.delay.set_mix(params.delay_mix);
        self.delay.set_feedback(params.delay_feedback);
        self.reverb.set_mix(params.reverb);
    }

    fn set_cutoff(&mut self, hz: f32) {
        let hz = hz.clamp(200.0, 20000.0);
        if hz != self.cutoff {
            self.cutoff = hz;
            self.lowpass_coef = one_pole_coefficient(hz, self.sample_rate);
        }
    }

    /// Retune the delay to a dotted eighth at `bpm`.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.delay.set_bpm(bpm);
    }

    pub fn delay(&self) -> &Delay {
        &self.delay
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub fn drive(&self) -> f32 {
        self.drive
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let x = self.lowpass.process(input, self.lowpass_coef);
        let x = soft_clip(x, self.drive);
        let x = self.delay.process(x);
        let x = self.reverb.process(x);
        self.compressor.process(x)
    }

    /// Silence every stage's memory.
    pub fn clear(&mut self) {
        self.lowpass.reset();
        self.delay.clear();
        self.reverb.clear();
        self.compressor.reset();
    }
}
