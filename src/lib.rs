pub mod clock;
pub mod config;
pub mod dsp;
pub mod error;
pub mod midi;
pub mod params;
pub mod pattern;
pub mod persist;
pub mod processor;
pub mod song;
pub mod state;
pub mod telemetry;
pub mod transport;

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::midi::MidiBuffer;
use crate::processor::Processor;
use crate::state::SharedState;
use crate::telemetry::{StateSnapshot, TelemetryWatcher};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

/// WASM-exposed: return the obstacle-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: render `bars` bars of the default session to a WAV byte
/// array, tail included.
#[wasm_bindgen]
pub fn render_demo_wav(bars: u32, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    let state = Arc::new(SharedState::default());
    let render = dsp::renderer::render(EngineConfig::with_sample_rate(sample_rate as f32), state, bars, true)
        .map_err(js_err)?;
    Ok(render.to_wav())
}

/// WASM-exposed: render `bars` bars of the default session to interleaved
/// stereo f32 samples for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_demo_samples(bars: u32, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    let state = Arc::new(SharedState::default());
    let render = dsp::renderer::render(EngineConfig::with_sample_rate(sample_rate as f32), state, bars, true)
        .map_err(js_err)?;
    Ok(render.samples)
}

/// A live engine for the browser: the editor calls the control methods, the
/// AudioWorklet calls `process` once per render quantum.
#[wasm_bindgen]
pub struct ObstacleHandle {
    state: Arc<SharedState>,
    processor: Processor,
    midi: MidiBuffer,
    watcher: TelemetryWatcher,
}

#[wasm_bindgen]
impl ObstacleHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f32) -> Result<ObstacleHandle, JsValue> {
        let config = EngineConfig::with_sample_rate(sample_rate);
        let state = Arc::new(SharedState::new(Default::default(), config.seed));
        let midi = MidiBuffer::with_capacity(config.midi_capacity);
        let processor = Processor::new(config, Arc::clone(&state)).map_err(js_err)?;
        Ok(ObstacleHandle {
            state,
            processor,
            midi,
            watcher: TelemetryWatcher::new(),
        })
    }

    /// Render one block into the two channel buffers.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.processor.process_block(left, right, None, &mut self.midi);
    }

    /// Raw MIDI bytes sent during the last `process` call, concatenated.
    pub fn midi_bytes(&self) -> Result<Vec<u8>, JsValue> {
        let mut out = Vec::new();
        for event in self.midi.events() {
            out.extend(event.to_bytes().map_err(js_err)?);
        }
        Ok(out)
    }

    pub fn toggle_step(&self, track: usize, step: usize) {
        self.state.toggle_step(track, step);
    }

    pub fn set_note_degree(&self, track: usize, step: usize, degree: i32) {
        self.state.set_note_degree(track, step, degree);
    }

    /// Select the edit pattern and return its contents.
    pub fn select_edit_pattern(&self, index: i32) -> Result<JsValue, JsValue> {
        let pattern = self.state.select_edit_pattern(index);
        serde_wasm_bindgen::to_value(&pattern).map_err(js_err)
    }

    pub fn set_song_slot(&self, slot: i32, pattern: i32, repeat: i32) {
        self.state.set_song_slot(slot, pattern, repeat);
    }

    pub fn set_song_length(&self, length: i32) {
        self.state.set_song_length(length);
    }

    pub fn set_loop_mode(&self, looping: bool) {
        self.state.set_loop_mode(looping);
    }

    pub fn request_next(&self) {
        self.state.request_next();
    }

    pub fn toggle_play(&self) {
        self.state.toggle_play();
    }

    pub fn stop(&self) {
        self.state.stop();
    }

    pub fn set_parameter(&self, name: &str, value: f32) -> Result<(), JsValue> {
        self.state.set_parameter(name, value).map_err(js_err)
    }

    /// Randomize the edit pattern and return it.
    pub fn randomize(&self) -> Result<JsValue, JsValue> {
        let pattern = self.state.randomize_edit_pattern();
        serde_wasm_bindgen::to_value(&pattern).map_err(js_err)
    }

    /// Full state for the editor's initial draw.
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&StateSnapshot::capture(&self.state)).map_err(js_err)
    }

    /// Changes since the last poll, as an array of tagged events.
    pub fn poll_telemetry(&mut self) -> Result<JsValue, JsValue> {
        let events = self.watcher.poll(&self.state);
        serde_wasm_bindgen::to_value(&events).map_err(js_err)
    }

    pub fn save_state(&self) -> Result<Vec<u8>, JsValue> {
        persist::save_state(&self.state).map_err(js_err)
    }

    pub fn load_state(&self, bytes: &[u8]) -> Result<(), JsValue> {
        persist::load_state(&self.state, bytes).map_err(js_err)
    }

    pub fn tail_seconds(&self) -> f32 {
        self.processor.tail_seconds()
    }
}
