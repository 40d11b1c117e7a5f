//! The audio-path owner: step clock, song cursor, synth engine and MIDI note
//! tracking, driven one block at a time.
//!
//! Per block: resolve host transport, snapshot parameters, handle play/stop
//! edges, then per sample tick the clock, fire the step's cells and render one
//! mono sample duplicated to both channels. Nothing here allocates or blocks
//! once constructed.

use std::sync::Arc;

use log::info;

use crate::clock::StepClock;
use crate::config::EngineConfig;
use crate::dsp::engine::SynthEngine;
use crate::error::{ObstacleError, Result};
use crate::midi::{MidiBuffer, NoteTracker, velocity_for};
use crate::params::{ParamId, ParamValues};
use crate::pattern::Track;
use crate::song::{BarStart, SongCursor};
use crate::state::SharedState;
use crate::transport::{HostPosition, TransportSync};

/// Tail reported to hosts and appended by the offline renderer, in seconds.
pub const TAIL_SECONDS: f32 = 4.0;

pub struct Processor {
    config: EngineConfig,
    state: Arc<SharedState>,
    engine: SynthEngine,
    clock: StepClock,
    cursor: SongCursor,
    transport: TransportSync,
    notes: NoteTracker,
    was_playing: bool,
}

impl Processor {
    pub fn new(config: EngineConfig, state: Arc<SharedState>) -> Result<Self> {
        let sr = config.sample_rate;
        if !(sr.is_finite() && sr > 0.0) {
            return Err(ObstacleError::InvalidSampleRate(sr));
        }
        let values = state.params().snapshot();
        info!(
            "preparing processor: {sr} Hz, {:?} transport, {} bpm",
            config.transport_mode, values.bpm
        );
        let mut engine = SynthEngine::new(sr, config.seed);
        engine.apply_params(&values);
        let mut cursor = SongCursor::new();
        cursor.seek(state.play_slot());
        Ok(Self {
            engine,
            clock: StepClock::new(values.bpm, sr),
            cursor,
            transport: TransportSync::new(config.transport_mode),
            notes: NoteTracker::default(),
            was_playing: false,
            config,
            state,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn engine(&self) -> &SynthEngine {
        &self.engine
    }

    pub fn clock(&self) -> &StepClock {
        &self.clock
    }

    pub fn cursor(&self) -> &SongCursor {
        &self.cursor
    }

    pub fn tail_seconds(&self) -> f32 {
        TAIL_SECONDS
    }

    /// Render one block. `left` and `right` should be the same length; the
    /// shorter one bounds the block. `midi` is cleared and refilled with this
    /// block's events, offsets relative to the block start.
    pub fn process_block(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        host: Option<&HostPosition>,
        midi: &mut MidiBuffer,
    ) {
        midi.clear();
        let n = left.len().min(right.len());

        let mut values = self.state.params().snapshot();
        let update = self.transport.sync(host, values.bpm);
        if let Some(bpm) = update.bpm {
            self.state.params().set(ParamId::Bpm, bpm);
            values.bpm = bpm;
        }
        if let Some(playing) = update.playing {
            self.state.set_playing(playing);
        }
        self.engine.apply_params(&values);
        self.clock.set_tempo(values.bpm, self.config.sample_rate);

        let playing = self.state.is_playing();
        let rewound = self.state.take_rewind();
        if !playing {
            if self.was_playing {
                self.halt(midi, 0);
            }
        } else if let Some(ppq) = update.started_at {
            // Host start aligns even when the control surface started first.
            self.start(ppq);
        } else if !self.was_playing || rewound {
            self.start(None);
        }
        self.was_playing = playing;

        if !playing {
            left.fill(0.0);
            right.fill(0.0);
            return;
        }

        for i in 0..n {
            if let Some(step) = self.clock.tick(values.swing) {
                if step == 0 && !self.on_bar_start(midi, i) {
                    left[i..].fill(0.0);
                    right[i..].fill(0.0);
                    return;
                }
                self.fire_step(step, &values, midi, i);
            }
            let s = self.engine.next_sample();
            left[i] = s;
            right[i] = s;
        }
    }

    /// Render effect and voice tails without sequencing, e.g. after the last
    /// bar of an offline render.
    pub fn render_tail(&mut self, out: &mut [f32]) {
        self.engine.render_into(out);
    }

    fn start(&mut self, ppq: Option<f64>) {
        match ppq {
            Some(ppq) => self.clock.align_to_ppq(ppq),
            None => self.clock.reset(),
        }
        self.cursor.seek(self.state.play_slot());
        let pattern = self.cursor.pattern(&*self.state);
        self.state.set_play_position(self.cursor.slot(), pattern);
    }

    fn halt(&mut self, midi: &mut MidiBuffer, offset: usize) {
        self.notes.all_notes_off(midi, offset);
        self.engine.release_all();
        self.state.set_current_step(-1);
    }

    /// Song-chain bookkeeping at step 0. Returns false when a non-looping
    /// chain ran out and playback stopped.
    fn on_bar_start(&mut self, midi: &mut MidiBuffer, offset: usize) -> bool {
        let force = self.state.next_requested();
        let outcome = self.cursor.on_bar_start(&*self.state, force);
        if outcome.consumed_request() {
            self.state.clear_next_request();
        }
        let pattern = self.cursor.pattern(&*self.state);
        self.state.set_play_position(self.cursor.slot(), pattern);

        if outcome == BarStart::Stop {
            self.halt(midi, offset);
            self.state.set_playing(false);
            self.was_playing = false;
            return false;
        }
        true
    }

    fn fire_step(&mut self, step: usize, values: &ParamValues, midi: &mut MidiBuffer, offset: usize) {
        let pattern = self.state.play_pattern();
        self.state.set_current_step(step as i32);

        for track in Track::ALL {
            let params = values.track(track);
            if params.mute || !self.state.is_active(pattern, track, step) {
                continue;
            }
            let degree = self.state.degree(pattern, track, step) as i32;
            self.engine.trigger(track, track.frequency(degree, values.key));
            self.notes.note_on(
                midi,
                offset,
                track,
                track.midi_note(degree, values.key),
                velocity_for(params.volume),
            );
        }
    }
}
