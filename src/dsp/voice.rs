//! The fixed voice set: one monophonic voice per track, dispatched through a
//! closed enum.

use crate::pattern::{NUM_TRACKS, Track};

use super::bass::Bass;
use super::hihat::Hihat;
use super::kick::Kick;
use super::lead::Lead;
use super::pad::Pad;
use super::snare::Snare;

#[derive(Debug, Clone)]
pub enum Voice {
    Kick(Kick),
    Snare(Snare),
    Hihat(Hihat),
    Bass(Bass),
    Lead(Lead),
    Pad(Pad),
}

impl Voice {
    /// The voice that plays `track`. `seed` feeds the noise sources.
    pub fn new(track: Track, sample_rate: f32, seed: u64) -> Self {
        match track {
            Track::Kick => Voice::Kick(Kick::new(sample_rate, seed)),
            Track::Snare => Voice::Snare(Snare::new(sample_rate, seed)),
            Track::Hihat => Voice::Hihat(Hihat::new(sample_rate, seed)),
            Track::Bass => Voice::Bass(Bass::new(sample_rate)),
            Track::Lead => Voice::Lead(Lead::new(sample_rate)),
            Track::Pad => Voice::Pad(Pad::new(sample_rate)),
        }
    }

    /// Start (or restart) the voice. Melodic voices need a frequency and
    /// ignore the trigger without one; drums ignore it. Hats are closed.
    pub fn trigger(&mut self, frequency: Option<f32>) {
        match (self, frequency) {
            (Voice::Kick(v), _) => v.trigger(),
            (Voice::Snare(v), _) => v.trigger(),
            (Voice::Hihat(v), _) => v.trigger(false),
            (Voice::Bass(v), Some(f)) => v.trigger(f),
            (Voice::Lead(v), Some(f)) => v.trigger(f),
            (Voice::Pad(v), Some(f)) => v.trigger(f),
            _ => {}
        }
    }

    /// Note off for the voices that sustain; one-shots play out.
    pub fn release(&mut self) {
        match self {
            Voice::Lead(v) => v.release(),
            Voice::Pad(v) => v.release(),
            _ => {}
        }
    }

    /// Apply the track's decay slot: sub decay, noise decay, closed-hat
    /// decay, filter openness or attack, depending on the voice.
    pub fn set_shape(&mut self, value: f32) {
        match self {
            Voice::Kick(v) => v.set_decay(value),
            Voice::Snare(v) => v.set_decay(value),
            Voice::Hihat(v) => v.set_decay(value),
            Voice::Bass(v) => v.set_filter_open(value),
            Voice::Lead(v) => v.set_attack(value),
            Voice::Pad(v) => v.set_attack(value),
        }
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        match self {
            Voice::Kick(v) => v.process(),
            Voice::Snare(v) => v.process(),
            Voice::Hihat(v) => v.process(),
            Voice::Bass(v) => v.process(),
            Voice::Lead(v) => v.process(),
            Voice::Pad(v) => v.process(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Voice::Kick(v) => v.is_active(),
            Voice::Snare(v) => v.is_active(),
            Voice::Hihat(v) => v.is_active(),
            Voice::Bass(v) => v.is_active(),
            Voice::Lead(v) => v.is_active(),
            Voice::Pad(v) => v.is_active(),
        }
    }
}

/// All six voices, indexed by track.
#[derive(Debug, Clone)]
pub struct VoiceBank {
    voices: [Voice; NUM_TRACKS],
}

impl VoiceBank {
    pub fn new(sample_rate: f32, seed: u64) -> Self {
        Self {
            voices: Track::ALL.map(|t| Voice::new(t, sample_rate, seed.wrapping_add(t.index() as u64))),
        }
    }

    pub fn voice(&self, track: Track) -> &Voice {
        &self.voices[track.index()]
    }

    pub fn trigger(&mut self, track: Track, frequency: Option<f32>) {
        self.voices[track.index()].trigger(frequency);
    }

    pub fn set_shape(&mut self, track: Track, value: f32) {
        self.voices[track.index()].set_shape(value);
    }

    pub fn release_all(&mut self) {
        for v in &mut self.voices {
            v.release();
        }
    }

    /// One sample from every voice, in track order.
    #[inline]
    pub fn process(&mut self) -> [f32; NUM_TRACKS] {
        let mut out = [0.0; NUM_TRACKS];
        for (o, v) in out.iter_mut().zip(&mut self.voices) {
            *o = v.process();
        }
        out
    }

    pub fn any_active(&self) -> bool {
        self.voices.iter().any(Voice::is_active)
    }
}
