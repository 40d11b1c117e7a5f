//! Lead: two micro-detuned saws with a slow vibrato and a square sub-octave.

use super::envelope::Envelope;
use super::oscillator::{Oscillator, Waveform};

const VIBRATO_HZ: f32 = 0.8;
const VIBRATO_DEPTH_HZ: f32 = 4.0;
const DETUNE_RATIO: f32 = 1.003;
/// Sustain time before the note releases by itself.
const GATE: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct Lead {
    sample_rate: f32,
    saw1: Oscillator,
    saw2: Oscillator,
    sub: Oscillator,
    vibrato: Oscillator,
    env: Envelope,
    frequency: f32,
    active: bool,
}

impl Lead {
    pub fn new(sample_rate: f32) -> Self {
        let mut env = Envelope::with_adsr(sample_rate, 0.12, 0.1, 0.7, 0.4);
        env.hold = Some(GATE);
        Self {
            sample_rate,
            saw1: Oscillator::new(Waveform::Sawtooth),
            saw2: Oscillator::new(Waveform::Sawtooth),
            sub: Oscillator::new(Waveform::Square),
            vibrato: Oscillator::new(Waveform::Sine),
            env,
            frequency: 220.0,
            active: false,
        }
    }

    pub fn set_attack(&mut self, seconds: f32) {
        self.env.attack = seconds.clamp(0.001, 0.50);
    }

    pub fn attack(&self) -> f32 {
        self.env.attack
    }

    /// Start a note. The vibrato keeps running across notes.
    pub fn trigger(&mut self, frequency: f32) {
        self.active = true;
        self.frequency = frequency;
        self.saw1.reset();
        self.saw2.reset();
        self.sub.reset();
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
        let f = self.frequency;

        let lfo = self.vibrato.next_sample(VIBRATO_HZ, sr) * VIBRATO_DEPTH_HZ;
        let saw1 = self.saw1.next_sample(f + lfo, sr);
        let saw2 = self.saw2.next_sample(f * DETUNE_RATIO + lfo, sr);
        let sub = self.sub.next_sample(f * 0.5, sr) * 0.5;

        let env = self.env.next_sample();
        if !self.env.is_active() {
            self.active = false;
        }

        ((saw1 + saw2) * 0.4 + sub * 0.25) * env * 0.55
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_before_trigger() {
        let mut lead = Lead::new(44100.0);
        assert_eq!(lead.process(), 0.0);
    }

    #[test]
    fn attack_is_clamped() {
        let mut lead = Lead::new(44100.0);
        lead.set_attack(0.0);
        assert_eq!(lead.attack(), 0.001);
        lead.set_attack(3.0);
        assert_eq!(lead.attack(), 0.50);
    }

    #[test]
    fn releases_on_its_own() {
        let sr = 44100.0;
        let mut lead = Lead::new(sr);
        lead.trigger(220.0);
        let mut n = 0;
        while lead.is_active() {
            let s = lead.process();
            assert!(s.abs() <= 1.0, "lead sample {s}");
            n += 1;
            assert!(n < 10 * 44100, "lead never released");
        }
        // attack 0.12 + decay 0.1 + gate 0.25 + release 0.4
        let expected = (0.87 * sr) as i32;
        assert!((n as i32 - expected).abs() < 40, "took {n}, expected ~{expected}");
    }

    #[test]
    fn release_cuts_the_note_short() {
        let mut lead = Lead::new(44100.0);
        lead.trigger(220.0);
        for _ in 0..4410 {
            lead.process();
        }
        lead.release();
        let mut n = 0;
        while lead.is_active() {
            lead.process();
            n += 1;
        }
        assert!(n <= (0.4 * 44100.0) as usize + 20, "release took {n}");
    }
}
