//! Bass: two detuned saws and a sub sine through a low-pass whose cutoff
//! follows a short attack/decay envelope.

use super::filter::OnePoleLowpass;
use super::oscillator::{Oscillator, Waveform};

const DETUNE: f32 = 0.012;
const FILTER_ATTACK: f32 = 0.02;
const FILTER_DECAY: f32 = 0.22;
const AMP_HOLD: f32 = 0.25;
const AMP_RELEASE: f32 = 0.30;
/// Cutoff coefficient with the filter envelope closed.
const CUTOFF_FLOOR: f32 = 0.003;
/// Coefficient span the envelope can add at full openness.
const CUTOFF_SPAN: f32 = 0.18;

#[derive(Debug, Clone)]
pub struct Bass {
    sample_rate: f32,
    saw1: Oscillator,
    saw2: Oscillator,
    sub: Oscillator,
    filter: OnePoleLowpass,
    amp: f32,
    frequency: f32,
    t: f32,
    active: bool,
    /// 0 keeps the filter dark, 1 lets the envelope open it fully.
    pub filter_open: f32,
}

impl Bass {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            saw1: Oscillator::new(Waveform::Sawtooth),
            saw2: Oscillator::new(Waveform::Sawtooth),
            sub: Oscillator::new(Waveform::Sine),
            filter: OnePoleLowpass::default(),
            amp: 0.0,
            frequency: 55.0,
            t: 0.0,
            active: false,
            filter_open: 1.0,
        }
    }

    pub fn set_filter_open(&mut self, amount: f32) {
        self.filter_open = amount.clamp(0.0, 1.0);
    }

    pub fn trigger(&mut self, frequency: f32) {
        self.active = true;
        self.frequency = frequency;
        self.t = 0.0;
        self.amp = 1.0;
        self.saw1.reset();
        self.saw2.reset();
        self.sub.reset();
        self.filter.reset();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Filter envelope at `t` seconds: linear rise, then linear fall to zero.
    fn filter_env(t: f32) -> f32 {
        if t < FILTER_ATTACK {
            t / FILTER_ATTACK
        } else {
            (1.0 - (t - FILTER_ATTACK) / FILTER_DECAY).max(0.0)
        }
    }

    pub fn process(&mut self) -> f32 {
        if !self.active {
            return 0.0;
        }
        let sr = self.sample_rate;
        let f = self.frequency;

        let saw1 = self.saw1.next_sample(f, sr);
        let saw2 = self.saw2.next_sample(f * (1.0 + DETUNE), sr);
        let sub = self.sub.next_sample(f * 0.5, sr) * 0.6;
        let raw = (saw1 + saw2) * 0.4 + sub;

        let cutoff = CUTOFF_FLOOR + Self::filter_env(self.t) * self.filter_open * CUTOFF_SPAN;
        let out = self.filter.process(raw, cutoff) * self.amp;

        if self.t > AMP_HOLD {
            self.amp = (1.0 - (self.t - AMP_HOLD) / AMP_RELEASE).max(0.0);
        }
        self.t += 1.0 / sr;
        if self.amp <= 0.0 {
            self.active = false;
        }

        out * 0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_before_trigger() {
        let mut bass = Bass::new(44100.0);
        assert_eq!(bass.process(), 0.0);
    }

    #[test]
    fn filter_env_shape() {
        assert_eq!(Bass::filter_env(0.0), 0.0);
        assert!((Bass::filter_env(0.01) - 0.5).abs() < 1e-6);
        assert!((Bass::filter_env(0.02) - 1.0).abs() < 1e-6);
        assert!((Bass::filter_env(0.13) - 0.5).abs() < 1e-5);
        assert_eq!(Bass::filter_env(1.0), 0.0);
    }

    #[test]
    fn lasts_hold_plus_release() {
        let mut bass = Bass::new(44100.0);
        bass.trigger(55.0);
        let mut n = 0;
        let mut peak = 0.0f32;
        while bass.is_active() {
            peak = peak.max(bass.process().abs());
            n += 1;
            assert!(n < 44100);
        }
        // 0.25 s hold + 0.3 s release
        let expected = (0.55 * 44100.0) as i32;
        assert!((n as i32 - expected).abs() < 25, "took {n}");
        assert!(peak > 0.05, "bass too quiet: {peak}");
    }

    #[test]
    fn closed_filter_is_darker() {
        let energy = |open: f32| {
            let mut bass = Bass::new(44100.0);
            bass.set_filter_open(open);
            bass.trigger(110.0);
            (0..4410).map(|_| bass.process().powi(2)).sum::<f32>()
        };
        assert!(energy(0.0) < energy(1.0));
    }
}
