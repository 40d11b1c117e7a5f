//! Hi-hat: five square waves at inharmonic ratios over 3.2 kHz, plus noise
//! above 9 kHz.

use super::envelope::LinearDecay;
use super::filter::OnePoleHighpass;
use super::oscillator::{Oscillator, Waveform, white_noise};

const BASE_HZ: f32 = 3200.0;
const RATIOS: [f32; 5] = [1.0, 1.483, 1.727, 2.017, 2.278];
const NOISE_CUTOFF_HZ: f32 = 9000.0;
const OPEN_DECAY: f32 = 0.35;

#[derive(Debug, Clone)]
pub struct Hihat {
    sample_rate: f32,
    partials: [Oscillator; 5],
    noise_hp: OnePoleHighpass,
    env: LinearDecay,
    rng: fastrand::Rng,
    open: bool,
    active: bool,
    /// Closed-hat decay time in seconds.
    pub closed_decay: f32,
}

impl Hihat {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self {
            sample_rate,
            partials: std::array::from_fn(|_| Oscillator::new(Waveform::Square)),
            noise_hp: OnePoleHighpass::default(),
            env: LinearDecay::default(),
            rng: fastrand::Rng::with_seed(seed),
            open: false,
            active: false,
            closed_decay: 0.06,
        }
    }

    pub fn set_decay(&mut self, seconds: f32) {
        self.closed_decay = seconds.clamp(0.01, 0.30);
    }

    /// Open hats ring for a fixed 0.35 s.
    pub fn trigger(&mut self, open: bool) {
        self.active = true;
        self.open = open;
        self.env.trigger();
        self.noise_hp.reset();
        for p in &mut self.partials {
            p.reset();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }
        let sr = self.sample_rate;

        let mut metal = 0.0;
        for (osc, ratio) in self.partials.iter_mut().zip(RATIOS) {
            metal += osc.next_sample(BASE_HZ * ratio, sr);
        }
        let metal = metal / RATIOS.len() as f32 * 0.5;

        let noise = self.noise_hp.process_hz(white_noise(&mut self.rng), NOISE_CUTOFF_HZ, sr) * 0.4;

        let decay = if self.open { OPEN_DECAY } else { self.closed_decay };
        let out = (metal + noise) * self.env.tick(decay, sr);
        if self.env.is_silent() {
            self.active = false;
        }
        out * 0.35
    }
}
