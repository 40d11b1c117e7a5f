//! Synth engine — the six voices, the mixer and the FX chain behind a single
//! per-sample call.
//!
//! The engine knows nothing about patterns or timing: the processor tells it
//! which voices to trigger and asks it for one mono sample at a time.

use crate::params::ParamValues;
use crate::pattern::Track;

use super::fx_chain::{FxChain, FxParams};
use super::mixer::Mixer;
use super::voice::VoiceBank;

#[derive(Debug, Clone)]
pub struct SynthEngine {
    sample_rate: f32,
    voices: VoiceBank,
    mixer: Mixer,
    fx: FxChain,
    bpm: f32,
}

impl SynthEngine {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        let values = ParamValues::default();
        let mut engine = Self {
            sample_rate,
            voices: VoiceBank::new(sample_rate, seed),
            mixer: Mixer::new(),
            fx: FxChain::new(sample_rate, values.bpm),
            bpm: values.bpm,
        };
        engine.apply_params(&values);
        engine
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Push a parameter snapshot into the voices, mixer and FX. Called once
    /// per block.
    pub fn apply_params(&mut self, values: &ParamValues) {
        for track in Track::ALL {
            self.voices.set_shape(track, values.track(track).decay);
        }
        self.mixer.apply(values);
        self.fx.set_params(&FxParams {
            cutoff: values.cutoff,
            drive: values.drive,
            delay_mix: values.delay_mix,
            delay_feedback: values.delay_feedback,
            reverb: values.reverb,
        });
        self.set_bpm(values.bpm);
    }

    /// Retune tempo-locked stages. No-op if the tempo is unchanged.
    pub fn set_bpm(&mut self, bpm: f32) {
        if bpm != self.bpm {
            self.bpm = bpm;
            self.fx.set_bpm(bpm);
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn trigger(&mut self, track: Track, frequency: Option<f32>) {
        self.voices.trigger(track, frequency);
    }

    /// Release every sustaining voice.
    pub fn release_all(&mut self) {
        self.voices.release_all();
    }

    pub fn voices(&self) -> &VoiceBank {
        &self.voices
    }

    pub fn fx(&self) -> &FxChain {
        &self.fx
    }

    /// Voices → mixer → FX chain.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let dry = self.mixer.mix(&self.voices.process());
        self.fx.process(dry)
    }

    /// Render `n` samples of tail into `out`, with no new triggers.
    pub fn render_into(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_without_triggers() {
        let mut engine = SynthEngine::new(44100.0, 1);
        for _ in 0..1024 {
            assert_eq!(engine.next_sample(), 0.0);
        }
    }

    #[test]
    fn kick_produces_bounded_sound() {
        let mut engine = SynthEngine::new(44100.0, 1);
        engine.trigger(Track::Kick, None);
        let mut buf = vec![0.0; 4410];
        engine.render_into(&mut buf);
        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.05, "kick too quiet: {peak}");
        assert!(peak <= 1.0);
    }

    #[test]
    fn muted_track_is_silent() {
        let mut engine = SynthEngine::new(44100.0, 1);
        let mut values = ParamValues::default();
        values.tracks[Track::Snare.index()].mute = true;
        engine.apply_params(&values);
        engine.trigger(Track::Snare, None);
        for _ in 0..2048 {
            assert_eq!(engine.next_sample(), 0.0);
        }
    }

    #[test]
    fn tempo_reaches_the_delay() {
        let mut engine = SynthEngine::new(48000.0, 1);
        let values = ParamValues {
            bpm: 120.0,
            ..ParamValues::default()
        };
        engine.apply_params(&values);
        assert_eq!(engine.fx().delay().delay_samples(), 18000);
    }
}
