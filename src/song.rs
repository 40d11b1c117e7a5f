//! Song chain: an ordered, repeat-weighted list of pattern references, and
//! the cursor that walks it once per bar.

use serde::{Deserialize, Serialize};

use crate::pattern::NUM_PATTERNS;

pub const NUM_SONG_SLOTS: usize = 16;
pub const MAX_REPEAT: u8 = 8;

/// One chain entry: play `pattern` for `repeat` bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongSlot {
    pub pattern: u8,
    pub repeat: u8,
}

impl Default for SongSlot {
    fn default() -> Self {
        Self {
            pattern: 0,
            repeat: 1,
        }
    }
}

impl SongSlot {
    /// Build a slot with both fields clamped into range.
    pub fn new(pattern: i32, repeat: i32) -> Self {
        Self {
            pattern: pattern.clamp(0, NUM_PATTERNS as i32 - 1) as u8,
            repeat: repeat.clamp(1, MAX_REPEAT as i32) as u8,
        }
    }
}

pub fn clamp_chain_length(length: i32) -> usize {
    length.clamp(1, NUM_SONG_SLOTS as i32) as usize
}

/// Plain-data song chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongChain {
    pub slots: [SongSlot; NUM_SONG_SLOTS],
    /// Active length in `1..=16`.
    pub length: usize,
    /// Wrap to slot 0 after the last active slot instead of stopping.
    pub loop_mode: bool,
}

impl Default for SongChain {
    fn default() -> Self {
        Self {
            slots: [SongSlot::default(); NUM_SONG_SLOTS],
            length: 1,
            loop_mode: true,
        }
    }
}

impl SongChain {
    /// A chain whose first slots are `slots`, in order.
    pub fn from_slots(slots: &[SongSlot], loop_mode: bool) -> Self {
        let mut chain = Self {
            loop_mode,
            ..Self::default()
        };
        for (dst, src) in chain.slots.iter_mut().zip(slots) {
            *dst = *src;
        }
        chain.length = clamp_chain_length(slots.len() as i32);
        chain
    }
}

/// Read access to a song chain, whether plain or shared.
pub trait ChainSource {
    fn chain_length(&self) -> usize;
    fn loop_mode(&self) -> bool;
    fn slot(&self, index: usize) -> SongSlot;
}

impl ChainSource for SongChain {
    fn chain_length(&self) -> usize {
        self.length.clamp(1, NUM_SONG_SLOTS)
    }

    fn loop_mode(&self) -> bool {
        self.loop_mode
    }

    fn slot(&self, index: usize) -> SongSlot {
        self.slots.get(index).copied().unwrap_or_default()
    }
}

/// What happened at a bar start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarStart {
    /// First bar after a start; nothing was counted.
    First,
    /// Same slot plays again.
    Repeat,
    /// Moved to the slot now reported by [`SongCursor::slot`].
    Advance,
    /// Reached the end of a non-looping chain; the cursor is back on slot 0.
    Stop,
}

impl BarStart {
    /// True when the bar start used up a pending force-advance request.
    pub fn consumed_request(self) -> bool {
        matches!(self, BarStart::Advance | BarStart::Stop)
    }
}

/// Position in the song chain plus the repeat counter for the current slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongCursor {
    slot: usize,
    loop_count: u32,
    pass_in_progress: bool,
}

impl SongCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Completed passes of the current slot.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Forget the pass in progress; the next bar start is a [`BarStart::First`].
    pub fn restart(&mut self) {
        self.loop_count = 0;
        self.pass_in_progress = false;
    }

    /// Jump to `slot` and restart.
    pub fn seek(&mut self, slot: usize) {
        self.slot = slot.min(NUM_SONG_SLOTS - 1);
        self.restart();
    }

    /// Pattern index for the current slot.
    pub fn pattern<C: ChainSource + ?Sized>(&self, chain: &C) -> usize {
        chain.slot(self.slot).pattern as usize
    }

    /// Handle step 0. `force_next` requests an advance regardless of the
    /// repeat count.
    pub fn on_bar_start<C: ChainSource + ?Sized>(&mut self, chain: &C, force_next: bool) -> BarStart {
        if !self.pass_in_progress {
            self.pass_in_progress = true;
            return BarStart::First;
        }

        self.loop_count += 1;
        let repeat = chain.slot(self.slot).repeat.max(1) as u32;
        if !force_next && self.loop_count < repeat {
            return BarStart::Repeat;
        }

        self.loop_count = 0;
        let next = self.slot + 1;
        if next >= chain.chain_length() {
            if chain.loop_mode() {
                self.slot = 0;
            } else {
                self.slot = 0;
                self.pass_in_progress = false;
                return BarStart::Stop;
            }
        } else {
            self.slot = next;
        }
        BarStart::Advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(chain: &SongChain, bars: usize) -> Vec<usize> {
        let mut cursor = SongCursor::new();
        let mut played = Vec::new();
        for _ in 0..bars {
            cursor.on_bar_start(chain, false);
            played.push(cursor.pattern(chain));
        }
        played
    }

    #[test]
    fn slot_clamps() {
        assert_eq!(SongSlot::new(11, 0), SongSlot { pattern: 7, repeat: 1 });
        assert_eq!(SongSlot::new(-1, 40), SongSlot { pattern: 0, repeat: 8 });
        assert_eq!(clamp_chain_length(0), 1);
        assert_eq!(clamp_chain_length(99), 16);
    }

    #[test]
    fn repeats_are_honoured_and_loop() {
        let chain = SongChain::from_slots(
            &[SongSlot::new(2, 2), SongSlot::new(1, 1), SongSlot::new(3, 3)],
            true,
        );
        let played = walk(&chain, 12);
        assert_eq!(played, vec![2, 2, 1, 3, 3, 3, 2, 2, 1, 3, 3, 3]);
    }

    #[test]
    fn stops_at_end_without_loop() {
        let chain = SongChain::from_slots(&[SongSlot::new(0, 1), SongSlot::new(1, 1)], false);
        let mut cursor = SongCursor::new();
        assert_eq!(cursor.on_bar_start(&chain, false), BarStart::First);
        assert_eq!(cursor.on_bar_start(&chain, false), BarStart::Advance);
        assert_eq!(cursor.slot(), 1);
        assert_eq!(cursor.on_bar_start(&chain, false), BarStart::Stop);
        assert_eq!(cursor.slot(), 0);
        // Starting again counts from a fresh first bar.
        assert_eq!(cursor.on_bar_start(&chain, false), BarStart::First);
    }

    #[test]
    fn force_next_skips_remaining_repeats() {
        let chain = SongChain::from_slots(&[SongSlot::new(4, 8), SongSlot::new(5, 8)], true);
        let mut cursor = SongCursor::new();
        let first = cursor.on_bar_start(&chain, true);
        assert_eq!(first, BarStart::First);
        assert!(!first.consumed_request());
        let forced = cursor.on_bar_start(&chain, true);
        assert!(forced.consumed_request());
        assert_eq!(cursor.pattern(&chain), 5);
        assert_eq!(cursor.loop_count(), 0);
    }

    #[test]
    fn shrinking_the_chain_wraps_a_stale_slot() {
        let mut chain = SongChain::from_slots(&[SongSlot::new(0, 1); 4], true);
        let mut cursor = SongCursor::new();
        cursor.seek(3);
        cursor.on_bar_start(&chain, false);
        chain.length = 2;
        assert_eq!(cursor.on_bar_start(&chain, false), BarStart::Advance);
        assert_eq!(cursor.slot(), 0);
    }
}
