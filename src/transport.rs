//! Host transport: which side owns play/stop and tempo, resolved once per
//! block.

use crate::config::TransportMode;
use crate::params::BPM_RANGE;

/// Tempo changes smaller than this are ignored.
pub const BPM_DEADBAND: f32 = 0.05;

/// What a host reports at the start of a block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostPosition {
    pub bpm: Option<f64>,
    pub is_playing: bool,
    /// Musical position in quarter notes.
    pub ppq_position: Option<f64>,
}

/// Outcome of [`TransportSync::sync`] for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransportUpdate {
    /// New tempo when the host moved it past the deadband.
    pub bpm: Option<f32>,
    /// Set only on a host play-state edge.
    pub playing: Option<bool>,
    /// Set on a host stopped-to-playing edge: align to this position, or
    /// reset to step -1 when the host has none.
    pub started_at: Option<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct TransportSync {
    mode: TransportMode,
    was_host_playing: bool,
}

impl TransportSync {
    pub fn new(mode: TransportMode) -> Self {
        Self {
            mode,
            was_host_playing: false,
        }
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Compare the host's report against the current tempo and play state.
    /// Standalone use ignores the host; the control surface drives it alone.
    pub fn sync(&mut self, host: Option<&HostPosition>, current_bpm: f32) -> TransportUpdate {
        let Some(host) = host.filter(|_| self.mode == TransportMode::Hosted) else {
            return TransportUpdate::default();
        };
        let mut update = TransportUpdate::default();

        if let Some(bpm) = host.bpm.filter(|b| b.is_finite()) {
            let bpm = (bpm as f32).clamp(BPM_RANGE.0, BPM_RANGE.1);
            if (bpm - current_bpm).abs() > BPM_DEADBAND {
                update.bpm = Some(bpm);
            }
        }

        match (self.was_host_playing, host.is_playing) {
            (false, true) => {
                update.playing = Some(true);
                update.started_at = Some(host.ppq_position.filter(|p| p.is_finite()));
            }
            (true, false) => update.playing = Some(false),
            _ => {}
        }
        self.was_host_playing = host.is_playing;
        update
    }
}
