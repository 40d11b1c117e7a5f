//! Snare: a sine dropping 220 → 80 Hz plus high-passed noise.

use super::envelope::LinearDecay;
use super::filter::SvfHighpass;
use super::lerp;
use super::oscillator::{Oscillator, Waveform, white_noise};

const TONE_FROM_HZ: f32 = 220.0;
const TONE_TO_HZ: f32 = 80.0;
const TONE_SWEEP_TIME: f32 = 0.06;
const TONE_DECAY: f32 = 0.12;
const NOISE_CUTOFF_HZ: f32 = 1200.0;

#[derive(Debug, Clone)]
pub struct Snare {
    sample_rate: f32,
    tone: Oscillator,
    noise_hp: SvfHighpass,
    tone_env: LinearDecay,
    noise_env: LinearDecay,
    rng: fastrand::Rng,
    t: f32,
    active: bool,
    /// Noise decay time in seconds.
    pub noise_decay: f32,
}

impl Snare {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self {
            sample_rate,
            tone: Oscillator::new(Waveform::Sine),
            noise_hp: SvfHighpass::default(),
            tone_env: LinearDecay::default(),
            noise_env: LinearDecay::default(),
            rng: fastrand::Rng::with_seed(seed),
            t: 0.0,
            active: false,
            noise_decay: 0.18,
        }
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.noise_decay = seconds.clamp(0.05, 0.50);
    }

    pub fn trigger(&mut self) {
        self.active = true;
        self.t = 0.0;
        self.tone.reset();
        self.noise_hp.reset();
        self.tone_env.trigger();
        self.noise_env.trigger();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }
        let sr = self.sample_rate;

        let freq = lerp(TONE_FROM_HZ, TONE_TO_HZ, (self.t / TONE_SWEEP_TIME).clamp(0.0, 1.0));
        let tone = self.tone.next_sample(freq, sr) * self.tone_env.tick(TONE_DECAY, sr) * 0.5;

        let noise = self.noise_hp.process(white_noise(&mut self.rng), NOISE_CUTOFF_HZ, sr);
        let noise = noise * self.noise_env.tick(self.noise_decay, sr) * 0.6;

        self.t += 1.0 / sr;
        // The noise tail defines the hit; the tone is cut with it.
        if self.noise_env.is_silent() {
            self.active = false;
        }

        (tone + noise) * 0.55
    }
}
