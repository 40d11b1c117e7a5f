//! Tracks, scale tables and the 6 × 16 pattern grid.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

pub const STEPS_PER_PATTERN: usize = 16;
pub const NUM_PATTERNS: usize = 8;
pub const NUM_TRACKS: usize = Track::COUNT;
/// Degrees per scale table (one natural-minor octave).
pub const NUM_DEGREES: usize = 7;

// A natural minor, one table per register.
const BASS_SCALE: [i32; NUM_DEGREES] = [33, 35, 36, 38, 40, 41, 43]; // A1..G2
const LEAD_SCALE: [i32; NUM_DEGREES] = [57, 59, 60, 62, 64, 65, 67]; // A3..G4
const PAD_SCALE: [i32; NUM_DEGREES] = [45, 47, 48, 50, 52, 53, 55]; // A2..G3

/// One sequencer lane, each bound to exactly one voice.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Kick,
    Snare,
    Hihat,
    Bass,
    Lead,
    Pad,
}

impl Track {
    pub const ALL: [Track; NUM_TRACKS] = [
        Track::Kick,
        Track::Snare,
        Track::Hihat,
        Track::Bass,
        Track::Lead,
        Track::Pad,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Track> {
        Self::ALL.get(index).copied()
    }

    /// Bass, lead and pad take a pitch; the drums don't.
    pub fn is_melodic(self) -> bool {
        matches!(self, Track::Bass | Track::Lead | Track::Pad)
    }

    /// Zero-based MIDI channel (track `n` sends on channel `n + 1`).
    pub fn midi_channel(self) -> u8 {
        self as u8
    }

    fn scale(self) -> Option<&'static [i32; NUM_DEGREES]> {
        match self {
            Track::Bass => Some(&BASS_SCALE),
            Track::Lead => Some(&LEAD_SCALE),
            Track::Pad => Some(&PAD_SCALE),
            _ => None,
        }
    }

    /// Unclamped MIDI pitch for a step: the fixed GM drum note for drum
    /// tracks, otherwise the scale entry for `degree` transposed by `key`.
    fn raw_note(self, degree: i32, key: i32) -> i32 {
        match self.scale() {
            Some(scale) => scale[clamp_degree(degree) as usize] + key,
            None => match self {
                Track::Kick => 36,
                Track::Snare => 38,
                _ => 42,
            },
        }
    }

    /// MIDI note number emitted for a step, clamped to `0..=127`.
    pub fn midi_note(self, degree: i32, key: i32) -> u8 {
        self.raw_note(degree, key).clamp(0, 127) as u8
    }

    /// Oscillator frequency for a melodic step, `None` for drums.
    pub fn frequency(self, degree: i32, key: i32) -> Option<f32> {
        self.scale()
            .map(|_| midi_to_frequency(self.raw_note(degree, key)))
    }
}

/// Equal-tempered conversion with A4 (MIDI 69) = 440 Hz.
pub fn midi_to_frequency(midi: i32) -> f32 {
    440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0)
}

pub fn clamp_degree(degree: i32) -> u8 {
    degree.clamp(0, NUM_DEGREES as i32 - 1) as u8
}

/// Plain-data pattern: active flags plus a scale degree per cell.
///
/// The audio path reads the atomic mirror in [`crate::state::SharedState`];
/// this type is what gets snapshotted, persisted and generated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern {
    pub steps: [[bool; STEPS_PER_PATTERN]; NUM_TRACKS],
    pub degrees: [[u8; STEPS_PER_PATTERN]; NUM_TRACKS],
}

impl Pattern {
    pub fn is_active(&self, track: Track, step: usize) -> bool {
        self.steps[track.index()].get(step).copied().unwrap_or(false)
    }

    pub fn degree(&self, track: Track, step: usize) -> u8 {
        self.degrees[track.index()].get(step).copied().unwrap_or(0)
    }

    pub fn set_step(&mut self, track: Track, step: usize, active: bool) {
        if let Some(cell) = self.steps[track.index()].get_mut(step) {
            *cell = active;
        }
    }

    pub fn set_degree(&mut self, track: Track, step: usize, degree: i32) {
        if let Some(cell) = self.degrees[track.index()].get_mut(step) {
            *cell = clamp_degree(degree);
        }
    }

    fn set_note(&mut self, track: Track, step: usize, degree: i32) {
        self.set_step(track, step, true);
        self.set_degree(track, step, degree);
    }

    /// Hypnotic minimal techno groove in A minor; the content of pattern A
    /// on a fresh engine.
    pub fn default_groove() -> Self {
        let mut pat = Pattern::default();

        for s in [0, 4, 10, 12] {
            pat.set_step(Track::Kick, s, true);
        }
        for s in [4, 12] {
            pat.set_step(Track::Snare, s, true);
        }
        for s in [0, 1, 3, 5, 7, 9, 11, 13, 15] {
            pat.set_step(Track::Hihat, s, true);
        }

        let bass_steps = [0, 2, 4, 5, 6, 8, 10, 12, 14, 15];
        let bass_degrees = [0, 0, 0, 2, 0, 0, 3, 0, 0, 4];
        for (s, d) in bass_steps.into_iter().zip(bass_degrees) {
            pat.set_note(Track::Bass, s, d);
        }

        pat.set_note(Track::Lead, 4, 0);
        pat.set_note(Track::Lead, 11, 1);
        pat.set_note(Track::Pad, 0, 0);
        pat
    }

    /// A fresh random groove: four-on-the-floor kick with syncopations,
    /// backbeat snare with ghosts, straight or busy hats, and sparse
    /// melodic lines.
    pub fn randomized(rng: &mut fastrand::Rng) -> Self {
        let mut pat = Pattern::default();

        for s in [0, 4, 8, 12] {
            pat.set_step(Track::Kick, s, true);
        }
        for s in (1..STEPS_PER_PATTERN).step_by(2) {
            if rng.f32() > 0.82 {
                pat.set_step(Track::Kick, s, true);
            }
        }

        pat.set_step(Track::Snare, 4, true);
        pat.set_step(Track::Snare, 12, true);
        for s in 0..STEPS_PER_PATTERN {
            if s != 4 && s != 12 && rng.f32() > 0.88 {
                pat.set_step(Track::Snare, s, true);
            }
        }

        let sixteenths = rng.bool();
        for s in 0..STEPS_PER_PATTERN {
            let on = if sixteenths { rng.f32() > 0.3 } else { s % 2 == 0 };
            pat.set_step(Track::Hihat, s, on);
        }

        for s in 0..STEPS_PER_PATTERN {
            if rng.f32() > 0.55 {
                pat.set_note(Track::Bass, s, rng.i32(0..NUM_DEGREES as i32));
            }
        }
        for s in 0..STEPS_PER_PATTERN {
            if rng.f32() > 0.72 {
                pat.set_note(Track::Lead, s, rng.i32(0..NUM_DEGREES as i32));
            }
        }
        for s in [0, 8] {
            pat.set_note(Track::Pad, s, rng.i32(0..3));
        }
        pat
    }
}
