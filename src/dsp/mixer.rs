//! Mixer — sums the six voices with per-track gain and master gain.

use crate::params::ParamValues;
use crate::pattern::{NUM_TRACKS, Track};

#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f32,
    gains: [f32; NUM_TRACKS],
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            master_gain: 1.0,
            gains: [1.0; NUM_TRACKS],
        }
    }

    /// Take track gains (zero when muted) and master volume from `values`.
    pub fn apply(&mut self, values: &ParamValues) {
        for track in Track::ALL {
            self.gains[track.index()] = values.track_gain(track);
        }
        self.master_gain = values.master_volume;
    }

    pub fn set_gain(&mut self, track: Track, gain: f32) {
        self.gains[track.index()] = gain;
    }

    pub fn gain(&self, track: Track) -> f32 {
        self.gains[track.index()]
    }

    /// Weighted mono sum, scaled by the master gain.
    #[inline]
    pub fn mix(&self, voices: &[f32; NUM_TRACKS]) -> f32 {
        let sum: f32 = voices.iter().zip(&self.gains).map(|(v, g)| v * g).sum();
        sum * self.master_gain
    }
}

/// Drive-normalised tanh soft clipper: `tanh(drive·x) / drive`.
#[inline]
pub fn soft_clip(x: f32, drive: f32) -> f32 {
    (x * drive).tanh() / drive
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_in_silence_out() {
        let m = Mixer::new();
        assert_eq!(m.mix(&[0.0; NUM_TRACKS]), 0.0);
    }

    #[test]
    fn muted_tracks_drop_out() {
        let mut values = ParamValues::default();
        values.tracks[Track::Snare.index()].mute = true;
        values.tracks[Track::Kick.index()].volume = 0.5;
        values.master_volume = 2.0;
        let mut m = Mixer::new();
        m.apply(&values);
        let out = m.mix(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!((out - 1.0).abs() < 1e-6, "got {out}");
        assert_eq!(m.gain(Track::Snare), 0.0);
    }

    #[test]
    fn soft_clip_is_bounded_by_one_over_drive() {
        for drive in [0.5, 1.4, 10.0] {
            let y = soft_clip(1000.0, drive);
            assert!(y <= 1.0 / drive + 1e-6, "drive {drive}: {y}");
        }
        // Small signals pass nearly unchanged.
        assert!((soft_clip(0.01, 1.4) - 0.01).abs() < 1e-4);
    }
}
