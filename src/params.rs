//! Engine parameters: names, ranges, defaults, and the lock-free store the
//! control path writes and the audio path reads once per block.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::ObstacleError;
use crate::pattern::{NUM_TRACKS, Track};

pub const BPM_RANGE: (f32, f32) = (60.0, 200.0);
pub const VOLUME_RANGE: (f32, f32) = (0.0, 1.5);
pub const REVERB_RANGE: (f32, f32) = (0.0, 1.0);
pub const DELAY_MIX_RANGE: (f32, f32) = (0.0, 0.9);
pub const DELAY_FEEDBACK_RANGE: (f32, f32) = (0.0, 0.9);
pub const CUTOFF_RANGE: (f32, f32) = (500.0, 20000.0);
pub const SWING_RANGE: (f32, f32) = (0.0, 0.30);
pub const DRIVE_RANGE: (f32, f32) = (0.5, 10.0);
pub const KEY_RANGE: (i32, i32) = (-12, 12);

/// (min, max, default) of each track's decay slot. What the slot controls
/// depends on the voice: sub decay, noise decay, closed-hat decay, filter
/// openness, lead attack, pad attack.
const DECAY_RANGES: [(f32, f32, f32); NUM_TRACKS] = [
    (0.10, 1.50, 0.40),
    (0.05, 0.50, 0.18),
    (0.01, 0.30, 0.06),
    (0.00, 1.00, 0.80),
    (0.01, 0.50, 0.12),
    (0.10, 5.00, 1.50),
];

/// An `f32` stored as raw bits in an `AtomicU32`.
#[derive(Debug, Default)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Addressable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamId {
    Bpm,
    MasterVolume,
    Reverb,
    DelayMix,
    DelayFeedback,
    Cutoff,
    Swing,
    Drive,
    Key,
    TrackVolume(Track),
    TrackMute(Track),
    TrackDecay(Track),
}

impl ParamId {
    /// Inclusive value range. Mute is reported as `0..=1`.
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::Bpm => BPM_RANGE,
            ParamId::MasterVolume | ParamId::TrackVolume(_) => VOLUME_RANGE,
            ParamId::Reverb => REVERB_RANGE,
            ParamId::DelayMix => DELAY_MIX_RANGE,
            ParamId::DelayFeedback => DELAY_FEEDBACK_RANGE,
            ParamId::Cutoff => CUTOFF_RANGE,
            ParamId::Swing => SWING_RANGE,
            ParamId::Drive => DRIVE_RANGE,
            ParamId::Key => (KEY_RANGE.0 as f32, KEY_RANGE.1 as f32),
            ParamId::TrackMute(_) => (0.0, 1.0),
            ParamId::TrackDecay(track) => {
                let (lo, hi, _) = DECAY_RANGES[track.index()];
                (lo, hi)
            }
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        let value = if value.is_finite() { value } else { lo };
        match self {
            ParamId::Key => value.round().clamp(lo, hi),
            ParamId::TrackMute(_) => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            _ => value.clamp(lo, hi),
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamId::Bpm => write!(f, "bpm"),
            ParamId::MasterVolume => write!(f, "master_volume"),
            ParamId::Reverb => write!(f, "reverb"),
            ParamId::DelayMix => write!(f, "delay"),
            ParamId::DelayFeedback => write!(f, "delay_feedback"),
            ParamId::Cutoff => write!(f, "cutoff"),
            ParamId::Swing => write!(f, "swing"),
            ParamId::Drive => write!(f, "drive"),
            ParamId::Key => write!(f, "key"),
            ParamId::TrackVolume(t) => write!(f, "{t}_volume"),
            ParamId::TrackMute(t) => write!(f, "{t}_mute"),
            ParamId::TrackDecay(t) => write!(f, "{t}_decay"),
        }
    }
}

impl FromStr for ParamId {
    type Err = ObstacleError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let id = match name {
            "bpm" => ParamId::Bpm,
            "master_volume" => ParamId::MasterVolume,
            "reverb" => ParamId::Reverb,
            "delay" => ParamId::DelayMix,
            "delay_feedback" => ParamId::DelayFeedback,
            "cutoff" => ParamId::Cutoff,
            "swing" => ParamId::Swing,
            "drive" => ParamId::Drive,
            "key" => ParamId::Key,
            _ => {
                let unknown = || ObstacleError::UnknownParameter(name.to_string());
                let (track, field) = name.split_once('_').ok_or_else(unknown)?;
                let track = Track::from_str(track).map_err(|_| unknown())?;
                match field {
                    "volume" => ParamId::TrackVolume(track),
                    "mute" => ParamId::TrackMute(track),
                    "decay" => ParamId::TrackDecay(track),
                    _ => return Err(unknown()),
                }
            }
        };
        Ok(id)
    }
}

/// Per-track mixer and voice settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackParams {
    pub volume: f32,
    pub mute: bool,
    /// Voice-specific shaping value; see [`ParamId::TrackDecay`].
    pub decay: f32,
}

/// A plain copy of every parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamValues {
    pub bpm: f32,
    pub master_volume: f32,
    pub reverb: f32,
    pub delay_mix: f32,
    pub delay_feedback: f32,
    pub cutoff: f32,
    pub swing: f32,
    pub drive: f32,
    pub key: i32,
    pub tracks: [TrackParams; NUM_TRACKS],
}

impl Default for ParamValues {
    fn default() -> Self {
        Self {
            bpm: 128.0,
            master_volume: 1.0,
            reverb: 0.40,
            delay_mix: 0.35,
            delay_feedback: 0.42,
            cutoff: 8000.0,
            swing: 0.0,
            drive: 1.4,
            key: 0,
            tracks: std::array::from_fn(|i| TrackParams {
                volume: 1.0,
                mute: false,
                decay: DECAY_RANGES[i].2,
            }),
        }
    }
}

impl ParamValues {
    pub fn track(&self, track: Track) -> &TrackParams {
        &self.tracks[track.index()]
    }

    /// Effective mixer gain: zero when muted.
    pub fn track_gain(&self, track: Track) -> f32 {
        let t = self.track(track);
        if t.mute { 0.0 } else { t.volume }
    }

    /// Every value pulled into its documented range.
    pub fn clamped(mut self) -> Self {
        self.bpm = ParamId::Bpm.clamp(self.bpm);
        self.master_volume = ParamId::MasterVolume.clamp(self.master_volume);
        self.reverb = ParamId::Reverb.clamp(self.reverb);
        self.delay_mix = ParamId::DelayMix.clamp(self.delay_mix);
        self.delay_feedback = ParamId::DelayFeedback.clamp(self.delay_feedback);
        self.cutoff = ParamId::Cutoff.clamp(self.cutoff);
        self.swing = ParamId::Swing.clamp(self.swing);
        self.drive = ParamId::Drive.clamp(self.drive);
        self.key = self.key.clamp(KEY_RANGE.0, KEY_RANGE.1);
        for track in Track::ALL {
            let t = &mut self.tracks[track.index()];
            t.volume = ParamId::TrackVolume(track).clamp(t.volume);
            t.decay = ParamId::TrackDecay(track).clamp(t.decay);
        }
        self
    }
}

/// Lock-free parameter store shared by the control and audio paths.
///
/// Each value is an independent relaxed atomic; a block may observe a mix of
/// old and new values, which is inaudible for these controls.
#[derive(Debug)]
pub struct Params {
    bpm: AtomicF32,
    master_volume: AtomicF32,
    reverb: AtomicF32,
    delay_mix: AtomicF32,
    delay_feedback: AtomicF32,
    cutoff: AtomicF32,
    swing: AtomicF32,
    drive: AtomicF32,
    key: AtomicI32,
    track_volume: [AtomicF32; NUM_TRACKS],
    track_mute: [AtomicBool; NUM_TRACKS],
    track_decay: [AtomicF32; NUM_TRACKS],
}

impl Default for Params {
    fn default() -> Self {
        Self::new(&ParamValues::default())
    }
}

impl Params {
    pub fn new(values: &ParamValues) -> Self {
        let values = values.clamped();
        Self {
            bpm: AtomicF32::new(values.bpm),
            master_volume: AtomicF32::new(values.master_volume),
            reverb: AtomicF32::new(values.reverb),
            delay_mix: AtomicF32::new(values.delay_mix),
            delay_feedback: AtomicF32::new(values.delay_feedback),
            cutoff: AtomicF32::new(values.cutoff),
            swing: AtomicF32::new(values.swing),
            drive: AtomicF32::new(values.drive),
            key: AtomicI32::new(values.key),
            track_volume: std::array::from_fn(|i| AtomicF32::new(values.tracks[i].volume)),
            track_mute: std::array::from_fn(|i| AtomicBool::new(values.tracks[i].mute)),
            track_decay: std::array::from_fn(|i| AtomicF32::new(values.tracks[i].decay)),
        }
    }

    /// Store `value` after clamping it into the parameter's range.
    pub fn set(&self, id: ParamId, value: f32) {
        let v = id.clamp(value);
        match id {
            ParamId::Bpm => self.bpm.store(v),
            ParamId::MasterVolume => self.master_volume.store(v),
            ParamId::Reverb => self.reverb.store(v),
            ParamId::DelayMix => self.delay_mix.store(v),
            ParamId::DelayFeedback => self.delay_feedback.store(v),
            ParamId::Cutoff => self.cutoff.store(v),
            ParamId::Swing => self.swing.store(v),
            ParamId::Drive => self.drive.store(v),
            ParamId::Key => self.key.store(v as i32, Ordering::Relaxed),
            ParamId::TrackVolume(t) => self.track_volume[t.index()].store(v),
            ParamId::TrackMute(t) => self.track_mute[t.index()].store(v >= 0.5, Ordering::Relaxed),
            ParamId::TrackDecay(t) => self.track_decay[t.index()].store(v),
        }
    }

    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::Bpm => self.bpm.load(),
            ParamId::MasterVolume => self.master_volume.load(),
            ParamId::Reverb => self.reverb.load(),
            ParamId::DelayMix => self.delay_mix.load(),
            ParamId::DelayFeedback => self.delay_feedback.load(),
            ParamId::Cutoff => self.cutoff.load(),
            ParamId::Swing => self.swing.load(),
            ParamId::Drive => self.drive.load(),
            ParamId::Key => self.key.load(Ordering::Relaxed) as f32,
            ParamId::TrackVolume(t) => self.track_volume[t.index()].load(),
            ParamId::TrackMute(t) => {
                if self.track_mute[t.index()].load(Ordering::Relaxed) {
                    1.0
                } else {
                    0.0
                }
            }
            ParamId::TrackDecay(t) => self.track_decay[t.index()].load(),
        }
    }

    pub fn snapshot(&self) -> ParamValues {
        ParamValues {
            bpm: self.bpm.load(),
            master_volume: self.master_volume.load(),
            reverb: self.reverb.load(),
            delay_mix: self.delay_mix.load(),
            delay_feedback: self.delay_feedback.load(),
            cutoff: self.cutoff.load(),
            swing: self.swing.load(),
            drive: self.drive.load(),
            key: self.key.load(Ordering::Relaxed),
            tracks: std::array::from_fn(|i| TrackParams {
                volume: self.track_volume[i].load(),
                mute: self.track_mute[i].load(Ordering::Relaxed),
                decay: self.track_decay[i].load(),
            }),
        }
    }

    pub fn apply(&self, values: &ParamValues) {
        let v = values.clamped();
        self.bpm.store(v.bpm);
        self.master_volume.store(v.master_volume);
        self.reverb.store(v.reverb);
        self.delay_mix.store(v.delay_mix);
        self.delay_feedback.store(v.delay_feedback);
        self.cutoff.store(v.cutoff);
        self.swing.store(v.swing);
        self.drive.store(v.drive);
        self.key.store(v.key, Ordering::Relaxed);
        for i in 0..NUM_TRACKS {
            self.track_volume[i].store(v.tracks[i].volume);
            self.track_mute[i].store(v.tracks[i].mute, Ordering::Relaxed);
            self.track_decay[i].store(v.tracks[i].decay);
        }
    }
}
