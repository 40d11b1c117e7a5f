//! What the editor hears back: change events polled at UI rate, and a full
//! snapshot for the initial state request.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::ParamValues;
use crate::pattern::Pattern;
use crate::song::SongChain;
use crate::state::SharedState;

/// One change reported to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Current step, or -1 while stopped.
    Step { step: i32 },
    PlayState { playing: bool },
    SongPosition { pattern: usize, slot: usize },
}

/// Remembers what was last reported and emits only differences.
///
/// Reads relaxed atomics written by the audio path and never writes to them.
#[derive(Debug, Clone)]
pub struct TelemetryWatcher {
    last_step: Option<i32>,
    last_playing: Option<bool>,
    last_position: Option<(usize, usize)>,
}

impl Default for TelemetryWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryWatcher {
    /// A watcher that reports everything on its first poll.
    pub fn new() -> Self {
        Self {
            last_step: None,
            last_playing: None,
            last_position: None,
        }
    }

    pub fn poll(&mut self, state: &SharedState) -> Vec<TelemetryEvent> {
        let mut events = Vec::new();
        let playing = state.is_playing();
        let step = if playing { state.current_step() } else { -1 };

        if self.last_step != Some(step) {
            self.last_step = Some(step);
            events.push(TelemetryEvent::Step { step });
        }
        if self.last_playing != Some(playing) {
            self.last_playing = Some(playing);
            events.push(TelemetryEvent::PlayState { playing });
        }
        let position = (state.play_pattern(), state.play_slot());
        if self.last_position != Some(position) {
            self.last_position = Some(position);
            events.push(TelemetryEvent::SongPosition {
                pattern: position.0,
                slot: position.1,
            });
        }
        events
    }
}

/// Everything the editor needs to draw itself from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub params: ParamValues,
    pub edit_pattern: usize,
    pub play_pattern: usize,
    pub play_slot: usize,
    pub playing: bool,
    /// Contents of the edit pattern.
    pub pattern: Pattern,
    pub chain: SongChain,
}

impl StateSnapshot {
    pub fn capture(state: &SharedState) -> Self {
        let edit_pattern = state.edit_pattern();
        Self {
            params: state.params().snapshot(),
            edit_pattern,
            play_pattern: state.play_pattern(),
            play_slot: state.play_slot(),
            playing: state.is_playing(),
            pattern: state.pattern(edit_pattern),
            chain: state.chain(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_poll_reports_everything_then_nothing() {
        let state = SharedState::default();
        let mut watcher = TelemetryWatcher::new();
        let events = watcher.poll(&state);
        assert_eq!(
            events,
            vec![
                TelemetryEvent::Step { step: -1 },
                TelemetryEvent::PlayState { playing: false },
                TelemetryEvent::SongPosition { pattern: 0, slot: 0 },
            ]
        );
        assert!(watcher.poll(&state).is_empty());
    }

    #[test]
    fn only_changes_are_reported() {
        let state = SharedState::default();
        let mut watcher = TelemetryWatcher::new();
        watcher.poll(&state);

        state.play();
        state.set_current_step(3);
        let events = watcher.poll(&state);
        assert_eq!(
            events,
            vec![
                TelemetryEvent::Step { step: 3 },
                TelemetryEvent::PlayState { playing: true },
            ]
        );

        state.set_play_position(2, 4);
        assert_eq!(
            watcher.poll(&state),
            vec![TelemetryEvent::SongPosition { pattern: 4, slot: 2 }]
        );
    }

    #[test]
    fn stopped_step_reads_minus_one() {
        let state = SharedState::default();
        state.set_current_step(9);
        let mut watcher = TelemetryWatcher::new();
        assert_eq!(watcher.poll(&state)[0], TelemetryEvent::Step { step: -1 });
    }

    #[test]
    fn snapshot_json() {
        let state = SharedState::default();
        state.select_edit_pattern(0);
        let json = StateSnapshot::capture(&state).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["edit_pattern"], 0);
        assert_eq!(value["params"]["bpm"], 128.0);
        assert_eq!(value["pattern"]["steps"][0][0], true);
        assert_eq!(value["chain"]["length"], 1);

        let event = serde_json::to_string(&TelemetryEvent::Step { step: 5 }).unwrap();
        assert_eq!(event, r#"{"type":"step","step":5}"#);
    }
}
