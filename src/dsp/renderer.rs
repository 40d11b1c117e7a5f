//! Offline renderer — plays the song for a number of bars through a
//! [`Processor`] and returns audio (f32 or WAV bytes) plus the MIDI it sent.

use std::sync::Arc;

use log::info;
use midly::num::{u15, u24, u28};
use midly::{Format, Header, MetaMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::clock::samples_per_step;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::midi::{MidiBuffer, MidiEvent};
use crate::pattern::STEPS_PER_PATTERN;
use crate::processor::{Processor, TAIL_SECONDS};
use crate::state::SharedState;

/// Samples per `process_block` call.
const BLOCK_SIZE: usize = 512;
/// MIDI file resolution, ticks per quarter note.
const MIDI_PPQ: u16 = 96;

/// The result of an offline render.
#[derive(Debug, Clone)]
pub struct Render {
    pub sample_rate: u32,
    pub bpm: f32,
    /// Interleaved stereo.
    pub samples: Vec<f32>,
    /// Every MIDI event sent, with its absolute sample position.
    pub midi: Vec<(u64, MidiEvent)>,
}

/// Play `bars` bars from the start of the song, then let the FX tail ring
/// out for [`TAIL_SECONDS`] if `tail` is set. Leaves the state stopped.
pub fn render(config: EngineConfig, state: Arc<SharedState>, bars: u32, tail: bool) -> Result<Render> {
    let sr = config.sample_rate;
    let bpm = state.params().snapshot().bpm;
    let midi_capacity = config.midi_capacity;
    let mut processor = Processor::new(config, Arc::clone(&state))?;

    let bar_len = samples_per_step(bpm, sr) * STEPS_PER_PATTERN as f64;
    let body = (bar_len * bars as f64).round() as usize;
    let tail_len = if tail { (TAIL_SECONDS * sr) as usize } else { 0 };
    info!("rendering {bars} bars at {bpm} bpm: {body} samples + {tail_len} tail");

    let mut samples = Vec::with_capacity((body + tail_len) * 2);
    let mut midi_log = Vec::new();
    let mut midi = MidiBuffer::with_capacity(midi_capacity);
    let mut left = [0.0f32; BLOCK_SIZE];
    let mut right = [0.0f32; BLOCK_SIZE];

    state.play();
    let mut pos = 0usize;
    while pos < body {
        let n = BLOCK_SIZE.min(body - pos);
        processor.process_block(&mut left[..n], &mut right[..n], None, &mut midi);
        midi_log.extend(
            midi.events()
                .iter()
                .map(|e| ((pos + e.sample_offset) as u64, *e)),
        );
        for (l, r) in left[..n].iter().zip(&right[..n]) {
            samples.push(*l);
            samples.push(*r);
        }
        pos += n;
    }

    // Stop edge: all-notes-off lands at the end of the body.
    state.stop();
    processor.process_block(&mut left[..0], &mut right[..0], None, &mut midi);
    midi_log.extend(midi.events().iter().map(|e| (pos as u64, *e)));

    let mut tail_buf = vec![0.0f32; tail_len];
    processor.render_tail(&mut tail_buf);
    for s in tail_buf {
        samples.push(s);
        samples.push(s);
    }

    Ok(Render {
        sample_rate: sr as u32,
        bpm,
        samples,
        midi: midi_log,
    })
}

impl Render {
    /// Frames (stereo sample pairs) in the render.
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    /// 16-bit stereo PCM WAV bytes.
    pub fn to_wav(&self) -> Vec<u8> {
        let pcm: Vec<i16> = self
            .samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        encode_wav(&pcm, self.sample_rate, 2)
    }

    /// A single-track Standard MIDI File of the render's events.
    pub fn to_smf(&self) -> Result<Vec<u8>> {
        let ticks_per_sample =
            MIDI_PPQ as f64 * self.bpm as f64 / (60.0 * self.sample_rate as f64);
        let micros_per_quarter = (60_000_000.0 / self.bpm as f64).round() as u32;

        let mut track = Vec::with_capacity(self.midi.len() + 2);
        track.push(TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(micros_per_quarter))),
        });
        let mut previous_tick = 0_u64;
        for (at, event) in &self.midi {
            let tick = (*at as f64 * ticks_per_sample).round() as u64;
            let delta = tick.saturating_sub(previous_tick).min(u64::from(u32::MAX)) as u32;
            track.push(TrackEvent {
                delta: u28::from(delta),
                kind: TrackEventKind::Midi {
                    channel: event.channel,
                    message: event.message,
                },
            });
            previous_tick = tick;
        }
        track.push(TrackEvent {
            delta: u28::from(0_u32),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        let header = Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(u15::from(MIDI_PPQ)),
        };
        let mut bytes = Vec::new();
        Smf {
            header,
            tracks: vec![track],
        }
        .write_std(&mut bytes)?;
        Ok(bytes)
    }
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MidiMessage;

    fn quick_render(bars: u32, tail: bool) -> Render {
        let state = Arc::new(SharedState::default());
        state.set_parameter("bpm", 200.0).unwrap();
        render(EngineConfig::with_sample_rate(8000.0), state, bars, tail).unwrap()
    }

    #[test]
    fn wav_header_valid() {
        let wav = quick_render(1, false).to_wav();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        // stereo
        assert_eq!(u16::from_le_bytes([wav[22], wav[23]]), 2);
        assert_eq!(u32::from_le_bytes([wav[24], wav[25], wav[26], wav[27]]), 8000);
    }

    #[test]
    fn length_is_bars_plus_tail() {
        // 200 bpm at 8 kHz: 600 samples per step, 9600 per bar.
        let r = quick_render(2, false);
        assert_eq!(r.frames(), 19200);
        let r = quick_render(2, true);
        assert_eq!(r.frames(), 19200 + 32000);
        let wav = r.to_wav();
        assert_eq!(wav.len(), 44 + r.samples.len() * 2);
    }

    #[test]
    fn render_is_audible_and_in_range() {
        let r = quick_render(1, true);
        let peak = r.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.05, "render too quiet: {peak}");
        assert!(peak <= 1.0);
    }

    #[test]
    fn midi_log_pairs_notes_and_ends_with_all_off() {
        let r = quick_render(1, false);
        let ons = r
            .midi
            .iter()
            .filter(|(_, e)| matches!(e.message, MidiMessage::NoteOn { .. }))
            .count();
        // Default groove: 4 kick, 2 snare, 9 hat, 10 bass, 2 lead, 1 pad.
        assert_eq!(ons, 28);
        let last = r.midi.last().unwrap();
        assert_eq!(last.0, 9600);
        assert!(matches!(last.1.message, MidiMessage::Controller { .. }));
    }

    #[test]
    fn smf_parses_back() {
        let bytes = quick_render(1, false).to_smf().unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::from(MIDI_PPQ)));
    }
}
