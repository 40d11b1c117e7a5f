//! DSP — pure Rust voice synthesis and the master effects chain.
//!
//! Everything here is mono `f32`, one sample per call. The same code runs in
//! the real-time processor, the WASM bridge and the offline renderer.

pub mod bass;
pub mod compressor;
pub mod delay;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod fx_chain;
pub mod hihat;
pub mod kick;
pub mod lead;
pub mod mixer;
pub mod oscillator;
pub mod pad;
pub mod renderer;
pub mod reverb;
pub mod snare;
pub mod voice;

/// Linear interpolation from `a` to `b`.
#[inline]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + t * (b - a)
}
