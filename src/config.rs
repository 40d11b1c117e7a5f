//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Which side is authoritative for play/stop and tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Running inside a host: host play state and tempo drive the sequencer.
    Hosted,
    /// No host: play/stop only come from the control surface.
    #[default]
    Standalone,
}

/// Construction-time settings for a [`crate::processor::Processor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Output sample rate in Hz.
    pub sample_rate: f32,
    pub transport_mode: TransportMode,
    /// Maximum MIDI events buffered per processing block.
    pub midi_capacity: usize,
    /// Seed for the noise generators and the pattern randomizer.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            transport_mode: TransportMode::Standalone,
            midi_capacity: 256,
            seed: 0x0b57_ac1e,
        }
    }
}

impl EngineConfig {
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }
}
