//! MIDI doubling of the sequencer: one channel per track, note-on/note-off
//! pairs per step and all-notes-off on stop.

pub use midly::live::LiveEvent;
pub use midly::{
    MidiMessage,
    num::{u4, u7},
};

use crate::error::Result;
use crate::pattern::{NUM_TRACKS, Track};

/// Controller number for "all notes off".
pub const ALL_NOTES_OFF: u8 = 123;

/// A MIDI message stamped with its offset into the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    pub sample_offset: usize,
    pub channel: u4,
    pub message: MidiMessage,
}

impl MidiEvent {
    pub fn note_on(sample_offset: usize, track: Track, key: u8, velocity: u8) -> Self {
        Self {
            sample_offset,
            channel: u4::new(track.midi_channel()),
            message: MidiMessage::NoteOn {
                key: u7::new(key.min(127)),
                vel: u7::new(velocity.min(127)),
            },
        }
    }

    pub fn note_off(sample_offset: usize, track: Track, key: u8) -> Self {
        Self {
            sample_offset,
            channel: u4::new(track.midi_channel()),
            message: MidiMessage::NoteOff {
                key: u7::new(key.min(127)),
                vel: u7::new(0),
            },
        }
    }

    pub fn all_notes_off(sample_offset: usize, track: Track) -> Self {
        Self {
            sample_offset,
            channel: u4::new(track.midi_channel()),
            message: MidiMessage::Controller {
                controller: u7::new(ALL_NOTES_OFF),
                value: u7::new(0),
            },
        }
    }

    /// Wire bytes of the message (status byte first).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(3);
        LiveEvent::Midi {
            channel: self.channel,
            message: self.message,
        }
        .write_std(&mut bytes)?;
        Ok(bytes)
    }
}

/// Step velocity for a track volume: `trunc(volume * 100)` in `1..=127`.
pub fn velocity_for(volume: f32) -> u8 {
    ((volume * 100.0) as i32).clamp(1, 127) as u8
}

/// Fixed-capacity event list filled by the audio path.
///
/// Space is reserved up front; events past capacity are dropped rather than
/// growing the buffer on the audio thread.
#[derive(Debug, Clone, Default)]
pub struct MidiBuffer {
    events: Vec<MidiEvent>,
    capacity: usize,
    dropped: usize,
}

impl MidiBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: MidiEvent) {
        if self.events.len() < self.capacity {
            self.events.push(event);
        } else {
            self.dropped += 1;
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events discarded since the last [`clear`](Self::clear).
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Last note sent per track, so every note-on is preceded by the matching
/// note-off.
#[derive(Debug, Clone, Default)]
pub struct NoteTracker {
    active: [Option<u8>; NUM_TRACKS],
}

impl NoteTracker {
    pub fn active(&self, track: Track) -> Option<u8> {
        self.active[track.index()]
    }

    /// Emit note-off for the previous note on the track (if any) and the new
    /// note-on.
    pub fn note_on(&mut self, out: &mut MidiBuffer, offset: usize, track: Track, key: u8, velocity: u8) {
        if let Some(prev) = self.active[track.index()] {
            out.push(MidiEvent::note_off(offset, track, prev));
        }
        out.push(MidiEvent::note_on(offset, track, key, velocity));
        self.active[track.index()] = Some(key);
    }

    /// Release every sounding note, then send CC 123 on each track channel.
    pub fn all_notes_off(&mut self, out: &mut MidiBuffer, offset: usize) {
        for track in Track::ALL {
            if let Some(prev) = self.active[track.index()].take() {
                out.push(MidiEvent::note_off(offset, track, prev));
            }
            out.push(MidiEvent::all_notes_off(offset, track));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_scaling() {
        assert_eq!(velocity_for(1.0), 100);
        assert_eq!(velocity_for(0.0), 1);
        assert_eq!(velocity_for(1.5), 127);
        assert_eq!(velocity_for(0.555), 55);
    }

    #[test]
    fn wire_bytes() {
        let on = MidiEvent::note_on(0, Track::Snare, 38, 100);
        assert_eq!(on.to_bytes().unwrap(), vec![0x91, 38, 100]);
        let cc = MidiEvent::all_notes_off(0, Track::Pad);
        assert_eq!(cc.to_bytes().unwrap(), vec![0xB5, 123, 0]);
    }

    #[test]
    fn retrigger_sends_note_off_first() {
        let mut out = MidiBuffer::with_capacity(16);
        let mut notes = NoteTracker::default();
        notes.note_on(&mut out, 10, Track::Bass, 33, 80);
        notes.note_on(&mut out, 20, Track::Bass, 36, 80);
        let events = out.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1], MidiEvent::note_off(20, Track::Bass, 33));
        assert_eq!(events[2], MidiEvent::note_on(20, Track::Bass, 36, 80));
        assert_eq!(notes.active(Track::Bass), Some(36));
    }

    #[test]
    fn all_notes_off_covers_every_channel() {
        let mut out = MidiBuffer::with_capacity(32);
        let mut notes = NoteTracker::default();
        notes.note_on(&mut out, 0, Track::Lead, 57, 12);
        out.clear();
        notes.all_notes_off(&mut out, 5);
        assert_eq!(out.len(), 1 + NUM_TRACKS);
        assert_eq!(out.events()[0], MidiEvent::all_notes_off(5, Track::Kick));
        assert_eq!(out.events()[4], MidiEvent::note_off(5, Track::Lead, 57));
        assert_eq!(out.events()[5], MidiEvent::all_notes_off(5, Track::Lead));
        assert!(notes.active(Track::Lead).is_none());
    }

    #[test]
    fn overflow_is_dropped() {
        let mut out = MidiBuffer::with_capacity(2);
        for _ in 0..5 {
            out.push(MidiEvent::all_notes_off(0, Track::Kick));
        }
        assert_eq!(out.len(), 2);
        assert_eq!(out.dropped(), 3);
    }
}
