//! Pad: four slightly detuned sines under a slow ADSR.

use super::envelope::Envelope;
use super::oscillator::{Oscillator, Waveform};

const DETUNES: [f32; 4] = [0.998, 1.000, 1.002, 1.004];
const GATE: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct Pad {
    sample_rate: f32,
    partials: [Oscillator; 4],
    env: Envelope,
    frequency: f32,
    active: bool,
}

impl Pad {
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Envelope::with_adsr(sample_rate, 1.5, 0.5, 0.6, 2.0);
        env.hold = Some(GATE);
        Self {
            sample_rate,
            partials: std::array::from_fn(|_| Oscillator::new(Waveform::Sine)),
            env,
            frequency: 110.0,
            active: false,
        }
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.env.attack = seconds.clamp(0.05, 5.0);
    }

    pub fn attack(&self) -> f32 {
        self.env.attack
    }

    pub fn trigger(&mut self, frequency: f32) {
        self.active = true;
        self.frequency = frequency;
        for p in &mut self.partials {
            p.reset();
        }
        self.env.gate_on();
    }

    pub fn release(&mut self) {
        self.env.gate_off();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }
        let sr = self.sample_rate;

        let mut sum = 0.0;
        for (osc, detune) in self.partials.iter_mut().zip(DETUNES) {
            sum += osc.next_sample(self.frequency * detune, sr);
        }
        let cluster = sum / DETUNES.len() as f32;

        let env = self.env.next_sample();
        if !self.env.is_active() {
            self.active = false;
        }
        cluster * env * 0.5
    }
}
