//! Persisted session state.
//!
//! Flat little-endian stream, in order:
//!
//! | field | encoding |
//! |---|---|
//! | bpm, master volume, reverb, delay mix, delay feedback, cutoff, swing, drive | `f32` × 8 |
//! | key | `i32` |
//! | per track: volume, mute, decay | `f32`, `u8`, `f32` |
//! | active flags, pattern-major / track-major / step-minor | `u8` × 768 |
//! | scale degrees, same order | `i32` × 768 |
//! | chain length | `i32` |
//! | loop mode | `u8` |
//! | per chain slot: pattern, repeat | `i32`, `i32` |
//! | edit pattern | `i32` |
//!
//! Reading stops at the first field the stream cannot supply; that field and
//! everything after it keep their previous values.

use std::io::{Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ObstacleError, Result};
use crate::params::ParamValues;
use crate::pattern::{NUM_PATTERNS, NUM_TRACKS, Pattern, STEPS_PER_PATTERN, clamp_degree};
use crate::song::{SongChain, SongSlot, clamp_chain_length};
use crate::state::SharedState;

/// Everything that survives a save/load cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub params: ParamValues,
    pub patterns: [Pattern; NUM_PATTERNS],
    pub chain: SongChain,
    pub edit_pattern: usize,
}

impl Default for Session {
    fn default() -> Self {
        let mut patterns: [Pattern; NUM_PATTERNS] = Default::default();
        patterns[0] = Pattern::default_groove();
        Self {
            params: ParamValues::default(),
            patterns,
            chain: SongChain::default(),
            edit_pattern: 0,
        }
    }
}

impl Session {
    /// Copy the shareable state out of `state`.
    pub fn capture(state: &SharedState) -> Self {
        Self {
            params: state.params().snapshot(),
            patterns: std::array::from_fn(|i| state.pattern(i)),
            chain: state.chain(),
            edit_pattern: state.edit_pattern(),
        }
    }

    /// Write this session into `state` and rewind playback to chain slot 0.
    pub fn restore(&self, state: &SharedState) {
        state.params().apply(&self.params);
        for (i, pattern) in self.patterns.iter().enumerate() {
            state.store_pattern(i, pattern);
        }
        state.store_chain(&self.chain);
        state.set_edit_pattern(self.edit_pattern);
        state.rewind();
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        let p = &self.params;
        for v in [
            p.bpm,
            p.master_volume,
            p.reverb,
            p.delay_mix,
            p.delay_feedback,
            p.cutoff,
            p.swing,
            p.drive,
        ] {
            w.write_f32::<LittleEndian>(v)?;
        }
        w.write_i32::<LittleEndian>(p.key)?;

        for t in &p.tracks {
            w.write_f32::<LittleEndian>(t.volume)?;
            w.write_u8(t.mute as u8)?;
            w.write_f32::<LittleEndian>(t.decay)?;
        }

        for pat in &self.patterns {
            for lane in &pat.steps {
                for &on in lane {
                    w.write_u8(on as u8)?;
                }
            }
        }
        for pat in &self.patterns {
            for lane in &pat.degrees {
                for &d in lane {
                    w.write_i32::<LittleEndian>(d as i32)?;
                }
            }
        }

        w.write_i32::<LittleEndian>(self.chain.length as i32)?;
        w.write_u8(self.chain.loop_mode as u8)?;
        for slot in &self.chain.slots {
            w.write_i32::<LittleEndian>(slot.pattern as i32)?;
            w.write_i32::<LittleEndian>(slot.repeat as i32)?;
        }

        w.write_i32::<LittleEndian>(self.edit_pattern as i32)?;
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Decode a stream on top of the defaults.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_over(bytes, Self::default())
    }

    /// Decode a stream on top of `base`: fields missing from a truncated or
    /// older stream keep the value they have in `base`. Values are clamped.
    pub fn decode_over(bytes: &[u8], mut base: Self) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(ObstacleError::StateTooShort { len: bytes.len() });
        }
        let mut r = FieldReader::new(bytes);
        let s = &mut base;

        for dst in [
            &mut s.params.bpm,
            &mut s.params.master_volume,
            &mut s.params.reverb,
            &mut s.params.delay_mix,
            &mut s.params.delay_feedback,
            &mut s.params.cutoff,
            &mut s.params.swing,
            &mut s.params.drive,
        ] {
            r.f32(dst);
        }
        r.i32(&mut s.params.key);

        for t in s.params.tracks.iter_mut() {
            r.f32(&mut t.volume);
            r.bool(&mut t.mute);
            r.f32(&mut t.decay);
        }

        for pat in s.patterns.iter_mut() {
            for lane in pat.steps.iter_mut() {
                for on in lane.iter_mut() {
                    r.bool(on);
                }
            }
        }
        for pat in s.patterns.iter_mut() {
            for lane in pat.degrees.iter_mut() {
                for d in lane.iter_mut() {
                    let mut v = *d as i32;
                    r.i32(&mut v);
                    *d = clamp_degree(v);
                }
            }
        }

        let mut length = s.chain.length as i32;
        r.i32(&mut length);
        s.chain.length = clamp_chain_length(length);
        r.bool(&mut s.chain.loop_mode);
        for slot in s.chain.slots.iter_mut() {
            let mut pattern = slot.pattern as i32;
            let mut repeat = slot.repeat as i32;
            r.i32(&mut pattern);
            r.i32(&mut repeat);
            *slot = SongSlot::new(pattern, repeat);
        }

        let mut edit = s.edit_pattern as i32;
        r.i32(&mut edit);
        s.edit_pattern = edit.clamp(0, NUM_PATTERNS as i32 - 1) as usize;

        if r.exhausted {
            warn!(
                "saved state truncated at byte {} of {}; keeping previous values for the rest",
                r.cursor.position(),
                encoded_len()
            );
        }
        base.params = base.params.clamped();
        Ok(base)
    }
}

/// Size of a complete stream.
pub const fn encoded_len() -> usize {
    let cells = NUM_PATTERNS * NUM_TRACKS * STEPS_PER_PATTERN;
    8 * 4 + 4 + NUM_TRACKS * 9 + cells + cells * 4 + 4 + 1 + crate::song::NUM_SONG_SLOTS * 8 + 4
}

/// Reads fields until the first one that does not fit, then reads nothing.
struct FieldReader<'a> {
    cursor: Cursor<&'a [u8]>,
    exhausted: bool,
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
            exhausted: false,
        }
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    fn take<T>(&mut self, size: usize, read: impl FnOnce(&mut Cursor<&'a [u8]>) -> std::io::Result<T>) -> Option<T> {
        if self.exhausted || self.remaining() < size {
            self.exhausted = true;
            return None;
        }
        read(&mut self.cursor).ok()
    }

    fn f32(&mut self, dst: &mut f32) {
        if let Some(v) = self.take(4, |c| c.read_f32::<LittleEndian>()) {
            *dst = v;
        }
    }

    fn i32(&mut self, dst: &mut i32) {
        if let Some(v) = self.take(4, |c| c.read_i32::<LittleEndian>()) {
            *dst = v;
        }
    }

    fn bool(&mut self, dst: &mut bool) {
        if let Some(v) = self.take(1, |c| c.read_u8()) {
            *dst = v != 0;
        }
    }
}

/// Serialize the shared state.
pub fn save_state(state: &SharedState) -> Result<Vec<u8>> {
    Session::capture(state).encode()
}

/// Load a stream into the shared state. Missing trailing fields keep their
/// current values.
pub fn load_state(state: &SharedState, bytes: &[u8]) -> Result<()> {
    let session = Session::decode_over(bytes, Session::capture(state))?;
    session.restore(state);
    debug!(
        "loaded state: {} bytes, chain length {}, editing pattern {}",
        bytes.len(),
        session.chain.length,
        session.edit_pattern
    );
    Ok(())
}

/// Read a whole stream from `reader` and load it.
pub fn load_state_from<R: Read>(state: &SharedState, reader: &mut R) -> Result<()> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_state(state, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Track;

    fn busy_session() -> Session {
        let mut s = Session::default();
        s.params.bpm = 97.5;
        s.params.key = -3;
        s.params.cutoff = 1234.5;
        s.params.tracks[Track::Lead.index()].mute = true;
        s.params.tracks[Track::Pad.index()].decay = 3.25;
        s.patterns[5].set_step(Track::Bass, 7, true);
        s.patterns[5].set_degree(Track::Bass, 7, 6);
        s.chain = SongChain::from_slots(
            &[SongSlot::new(0, 2), SongSlot::new(5, 1), SongSlot::new(3, 8)],
            false,
        );
        s.edit_pattern = 5;
        s
    }

    #[test]
    fn full_stream_has_the_documented_size() {
        let bytes = Session::default().encode().unwrap();
        assert_eq!(bytes.len(), encoded_len());
        // 128.0f32, little-endian
        assert_eq!(&bytes[..4], &128.0f32.to_le_bytes());
    }

    #[test]
    fn round_trip() {
        let s = busy_session();
        let decoded = Session::decode(&s.encode().unwrap()).unwrap();
        assert_eq!(decoded, s);
    }

    #[test]
    fn too_short_is_an_error() {
        assert!(matches!(
            Session::decode(&[1, 2, 3]),
            Err(ObstacleError::StateTooShort { len: 3 })
        ));
    }

    #[test]
    fn truncated_stream_keeps_trailing_defaults() {
        let s = busy_session();
        let bytes = s.encode().unwrap();
        // Params and track triples only.
        let cut = 8 * 4 + 4 + NUM_TRACKS * 9;
        let decoded = Session::decode(&bytes[..cut + 3]).unwrap();
        assert_eq!(decoded.params, s.params);
        assert_eq!(decoded.patterns, Session::default().patterns);
        assert_eq!(decoded.chain, SongChain::default());
        assert_eq!(decoded.edit_pattern, 0);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let mut s = busy_session();
        s.params.bpm = 1000.0;
        let mut bytes = s.encode().unwrap();
        // Last field: edit pattern = 99.
        let n = bytes.len();
        bytes[n - 4..].copy_from_slice(&99i32.to_le_bytes());
        let decoded = Session::decode(&bytes).unwrap();
        assert_eq!(decoded.params.bpm, 200.0);
        assert_eq!(decoded.edit_pattern, 7);
    }

    #[test]
    fn load_rewinds_to_the_first_slot() {
        let state = SharedState::default();
        state.set_play_position(1, 5);
        let bytes = busy_session().encode().unwrap();
        load_state(&state, &bytes).unwrap();
        assert_eq!(state.play_slot(), 0);
        assert_eq!(state.play_pattern(), 0);
        assert!(state.take_rewind());
        assert_eq!(state.edit_pattern(), 5);
        assert!(state.is_active(5, Track::Bass, 7));
        assert_eq!(save_state(&state).unwrap(), bytes);
    }
}
