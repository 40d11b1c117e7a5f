//! Kick: a sine sweeping 180 → 28 Hz, a 1200 Hz click and a low-passed noise
//! thump.

use super::envelope::LinearDecay;
use super::filter::OnePoleLowpass;
use super::lerp;
use super::oscillator::{Oscillator, Waveform, white_noise};

const SWEEP_FROM_HZ: f32 = 180.0;
const SWEEP_TO_HZ: f32 = 28.0;
const SWEEP_TIME: f32 = 0.30;
const CLICK_HZ: f32 = 1200.0;
const CLICK_DECAY: f32 = 0.008;
const THUMP_DECAY: f32 = 0.04;
const THUMP_COEFFICIENT: f32 = 0.15;

#[derive(Debug, Clone)]
pub struct Kick {
    sample_rate: f32,
    sub: Oscillator,
    click: Oscillator,
    thump: OnePoleLowpass,
    sub_env: LinearDecay,
    click_env: LinearDecay,
    thump_env: LinearDecay,
    rng: fastrand::Rng,
    /// Seconds since trigger.
    t: f32,
    active: bool,
    /// Sub decay time in seconds.
    pub sub_decay: f32,
}

impl Kick {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self {
            sample_rate,
            sub: Oscillator::new(Waveform::Sine),
            click: Oscillator::new(Waveform::Sine),
            thump: OnePoleLowpass::default(),
            sub_env: LinearDecay::default(),
            click_env: LinearDecay::default(),
            thump_env: LinearDecay::default(),
            rng: fastrand::Rng::with_seed(seed),
            t: 0.0,
            active: false,
            sub_decay: 0.40,
        }
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.sub_decay = seconds.clamp(0.10, 1.50);
    }

    pub fn trigger(&mut self) {
        self.active = true;
        self.t = 0.0;
        self.sub.reset();
        self.click.reset();
        self.thump.reset();
        self.sub_env.trigger();
        self.click_env.trigger();
        self.thump_env.trigger();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }
        let sr = self.sample_rate;

        let freq = lerp(SWEEP_FROM_HZ, SWEEP_TO_HZ, (self.t / SWEEP_TIME).clamp(0.0, 1.0));
        let sub = self.sub.next_sample(freq, sr) * self.sub_env.tick(self.sub_decay, sr);

        let click = self.click.next_sample(CLICK_HZ, sr) * self.click_env.tick(CLICK_DECAY, sr) * 0.7;

        let noise = white_noise(&mut self.rng);
        let thump = self.thump.process(noise, THUMP_COEFFICIENT) * self.thump_env.tick(THUMP_DECAY, sr) * 0.4;

        self.t += 1.0 / sr;
        if self.sub_env.is_silent() {
            self.active = false;
        }

        (sub + click + thump) * 0.6
    }
}
