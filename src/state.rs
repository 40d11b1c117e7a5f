//! State shared between the control path (editor, CLI, bridge) and the audio
//! path.
//!
//! Every field is an independent relaxed atomic. The audio path reads the
//! pattern grid and chain cell by cell while the editor may be writing them;
//! the sequencer is eventually consistent and tolerates an edit becoming
//! visible a sample late. Nothing here blocks the audio path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use log::{debug, trace};

use crate::error::Result;
use crate::params::{ParamId, ParamValues, Params};
use crate::pattern::{NUM_PATTERNS, NUM_TRACKS, Pattern, STEPS_PER_PATTERN, Track, clamp_degree};
use crate::song::{ChainSource, NUM_SONG_SLOTS, SongChain, SongSlot, clamp_chain_length};

type StepGrid<T> = [[[T; STEPS_PER_PATTERN]; NUM_TRACKS]; NUM_PATTERNS];

fn grid<T>(mut f: impl FnMut() -> T) -> StepGrid<T> {
    std::array::from_fn(|_| std::array::from_fn(|_| std::array::from_fn(|_| f())))
}

#[derive(Debug)]
pub struct SharedState {
    steps: StepGrid<AtomicBool>,
    degrees: StepGrid<AtomicU8>,
    chain_patterns: [AtomicU8; NUM_SONG_SLOTS],
    chain_repeats: [AtomicU8; NUM_SONG_SLOTS],
    chain_length: AtomicU8,
    loop_mode: AtomicBool,
    edit_pattern: AtomicU8,
    play_pattern: AtomicU8,
    play_slot: AtomicU8,
    next_requested: AtomicBool,
    rewind: AtomicBool,
    playing: AtomicBool,
    current_step: AtomicI32,
    params: Params,
    rng: Mutex<fastrand::Rng>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(ParamValues::default(), 0)
    }
}

impl SharedState {
    /// Fresh session: default groove in pattern A, a one-slot looping chain,
    /// stopped.
    pub fn new(values: ParamValues, seed: u64) -> Self {
        let state = Self {
            steps: grid(|| AtomicBool::new(false)),
            degrees: grid(|| AtomicU8::new(0)),
            chain_patterns: std::array::from_fn(|_| AtomicU8::new(0)),
            chain_repeats: std::array::from_fn(|_| AtomicU8::new(1)),
            chain_length: AtomicU8::new(1),
            loop_mode: AtomicBool::new(true),
            edit_pattern: AtomicU8::new(0),
            play_pattern: AtomicU8::new(0),
            play_slot: AtomicU8::new(0),
            next_requested: AtomicBool::new(false),
            rewind: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            current_step: AtomicI32::new(-1),
            params: Params::new(&values),
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        };
        state.store_pattern(0, &Pattern::default_groove());
        state
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ---- pattern grid -------------------------------------------------

    /// Whether the cell is active. Out-of-range indices read as inactive.
    #[inline]
    pub fn is_active(&self, pattern: usize, track: Track, step: usize) -> bool {
        self.steps
            .get(pattern)
            .and_then(|p| p[track.index()].get(step))
            .is_some_and(|cell| cell.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn degree(&self, pattern: usize, track: Track, step: usize) -> u8 {
        self.degrees
            .get(pattern)
            .and_then(|p| p[track.index()].get(step))
            .map_or(0, |cell| cell.load(Ordering::Relaxed))
    }

    /// Copy of one pattern. Out-of-range indices yield an empty pattern.
    pub fn pattern(&self, index: usize) -> Pattern {
        let mut pat = Pattern::default();
        if index >= NUM_PATTERNS {
            return pat;
        }
        for track in Track::ALL {
            for s in 0..STEPS_PER_PATTERN {
                pat.steps[track.index()][s] = self.is_active(index, track, s);
                pat.degrees[track.index()][s] = self.degree(index, track, s);
            }
        }
        pat
    }

    pub fn store_pattern(&self, index: usize, pattern: &Pattern) {
        let (Some(steps), Some(degrees)) = (self.steps.get(index), self.degrees.get(index)) else {
            return;
        };
        for t in 0..NUM_TRACKS {
            for s in 0..STEPS_PER_PATTERN {
                steps[t][s].store(pattern.steps[t][s], Ordering::Relaxed);
                degrees[t][s].store(clamp_degree(pattern.degrees[t][s] as i32), Ordering::Relaxed);
            }
        }
    }

    // ---- song chain ---------------------------------------------------

    pub fn chain(&self) -> SongChain {
        SongChain {
            slots: std::array::from_fn(|i| self.slot(i)),
            length: self.chain_length(),
            loop_mode: self.loop_mode(),
        }
    }

    pub fn store_chain(&self, chain: &SongChain) {
        for (i, slot) in chain.slots.iter().enumerate() {
            let slot = SongSlot::new(slot.pattern as i32, slot.repeat as i32);
            self.chain_patterns[i].store(slot.pattern, Ordering::Relaxed);
            self.chain_repeats[i].store(slot.repeat, Ordering::Relaxed);
        }
        self.chain_length
            .store(clamp_chain_length(chain.length as i32) as u8, Ordering::Relaxed);
        self.loop_mode.store(chain.loop_mode, Ordering::Relaxed);
    }

    // ---- transport / position ----------------------------------------

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    /// Step last triggered, or -1 before the first step.
    pub fn current_step(&self) -> i32 {
        self.current_step.load(Ordering::Relaxed)
    }

    pub fn edit_pattern(&self) -> usize {
        self.edit_pattern.load(Ordering::Relaxed) as usize
    }

    pub fn play_pattern(&self) -> usize {
        self.play_pattern.load(Ordering::Relaxed) as usize
    }

    pub fn play_slot(&self) -> usize {
        self.play_slot.load(Ordering::Relaxed) as usize
    }

    pub fn next_requested(&self) -> bool {
        self.next_requested.load(Ordering::Relaxed)
    }

    pub(crate) fn clear_next_request(&self) {
        self.next_requested.store(false, Ordering::Relaxed);
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }

    pub(crate) fn set_current_step(&self, step: i32) {
        self.current_step.store(step, Ordering::Relaxed);
    }

    pub(crate) fn set_play_position(&self, slot: usize, pattern: usize) {
        self.play_slot.store(slot.min(NUM_SONG_SLOTS - 1) as u8, Ordering::Relaxed);
        self.play_pattern
            .store(pattern.min(NUM_PATTERNS - 1) as u8, Ordering::Relaxed);
    }

    /// Move playback to chain slot 0 and have the audio path restart its
    /// cursor and clock there.
    pub(crate) fn rewind(&self) {
        self.set_play_position(0, self.slot(0).pattern as usize);
        self.rewind.store(true, Ordering::Relaxed);
    }

    pub(crate) fn take_rewind(&self) -> bool {
        self.rewind.swap(false, Ordering::Relaxed)
    }

    pub(crate) fn set_edit_pattern(&self, index: usize) {
        self.edit_pattern
            .store(index.min(NUM_PATTERNS - 1) as u8, Ordering::Relaxed);
    }

    // ---- control surface ---------------------------------------------

    /// Flip a cell of the edit pattern. Out-of-range indices are ignored.
    pub fn toggle_step(&self, track: usize, step: usize) {
        let Some(track) = Track::from_index(track) else {
            return;
        };
        let pattern = self.edit_pattern();
        if let Some(cell) = self.steps[pattern][track.index()].get(step) {
            let was = cell.fetch_xor(true, Ordering::Relaxed);
            trace!("toggle {track} step {step} in pattern {pattern}: {}", !was);
        }
    }

    /// Set the scale degree of a cell of the edit pattern, clamped to `0..=6`.
    pub fn set_note_degree(&self, track: usize, step: usize, degree: i32) {
        let Some(track) = Track::from_index(track) else {
            return;
        };
        let pattern = self.edit_pattern();
        if let Some(cell) = self.degrees[pattern][track.index()].get(step) {
            cell.store(clamp_degree(degree), Ordering::Relaxed);
        }
    }

    /// Choose the pattern the editor works on; clamped to `0..8`. Returns the
    /// selected pattern's contents.
    pub fn select_edit_pattern(&self, index: i32) -> Pattern {
        let index = index.clamp(0, NUM_PATTERNS as i32 - 1) as usize;
        self.set_edit_pattern(index);
        debug!("editing pattern {index}");
        self.pattern(index)
    }

    /// Write a chain slot. All arguments are clamped; the active length grows
    /// to include `slot`.
    pub fn set_song_slot(&self, slot: i32, pattern: i32, repeat: i32) {
        let slot = slot.clamp(0, NUM_SONG_SLOTS as i32 - 1) as usize;
        let entry = SongSlot::new(pattern, repeat);
        self.chain_patterns[slot].store(entry.pattern, Ordering::Relaxed);
        self.chain_repeats[slot].store(entry.repeat, Ordering::Relaxed);
        self.chain_length.fetch_max(slot as u8 + 1, Ordering::Relaxed);
        debug!(
            "song slot {slot} = pattern {} x{}",
            entry.pattern, entry.repeat
        );
    }

    pub fn set_song_length(&self, length: i32) {
        self.chain_length
            .store(clamp_chain_length(length) as u8, Ordering::Relaxed);
    }

    pub fn set_loop_mode(&self, looping: bool) {
        self.loop_mode.store(looping, Ordering::Relaxed);
    }

    /// Advance to the next chain slot at the next bar start.
    pub fn request_next(&self) {
        self.next_requested.store(true, Ordering::Relaxed);
    }

    pub fn play(&self) {
        self.set_playing(true);
    }

    pub fn stop(&self) {
        self.set_playing(false);
    }

    pub fn toggle_play(&self) {
        self.playing.fetch_xor(true, Ordering::Relaxed);
    }

    /// Set a parameter by name, e.g. `"bpm"` or `"lead_decay"`.
    pub fn set_parameter(&self, name: &str, value: f32) -> Result<()> {
        let id: ParamId = name.parse()?;
        self.params.set(id, value);
        trace!("{id} = {}", self.params.get(id));
        Ok(())
    }

    /// Replace the edit pattern with a fresh random groove and return it.
    pub fn randomize_edit_pattern(&self) -> Pattern {
        let pattern = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            Pattern::randomized(&mut rng)
        };
        let index = self.edit_pattern();
        self.store_pattern(index, &pattern);
        debug!("randomized pattern {index}");
        pattern
    }
}

impl ChainSource for SharedState {
    fn chain_length(&self) -> usize {
        clamp_chain_length(self.chain_length.load(Ordering::Relaxed) as i32)
    }

    fn loop_mode(&self) -> bool {
        self.loop_mode.load(Ordering::Relaxed)
    }

    fn slot(&self, index: usize) -> SongSlot {
        match (self.chain_patterns.get(index), self.chain_repeats.get(index)) {
            (Some(p), Some(r)) => SongSlot::new(
                p.load(Ordering::Relaxed) as i32,
                r.load(Ordering::Relaxed) as i32,
            ),
            _ => SongSlot::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ObstacleError;

    #[test]
    fn fresh_state_has_default_groove() {
        let state = SharedState::default();
        assert_eq!(state.pattern(0), Pattern::default_groove());
        assert_eq!(state.pattern(1), Pattern::default());
        assert_eq!(state.chain(), SongChain::default());
        assert!(!state.is_playing());
        assert_eq!(state.current_step(), -1);
    }

    #[test]
    fn edits_target_the_edit_pattern() {
        let state = SharedState::default();
        state.select_edit_pattern(3);
        state.toggle_step(Track::Lead.index(), 5);
        state.set_note_degree(Track::Lead.index(), 5, 9);
        assert!(state.is_active(3, Track::Lead, 5));
        assert_eq!(state.degree(3, Track::Lead, 5), 6);
        assert!(!state.is_active(0, Track::Lead, 5));

        state.toggle_step(Track::Lead.index(), 5);
        assert!(!state.is_active(3, Track::Lead, 5));
    }

    #[test]
    fn out_of_range_edits_are_ignored() {
        let state = SharedState::default();
        let before = state.pattern(0);
        state.toggle_step(6, 0);
        state.toggle_step(0, 16);
        state.set_note_degree(9, 3, 2);
        assert_eq!(state.pattern(0), before);
        assert_eq!(state.select_edit_pattern(12), state.pattern(7));
        assert_eq!(state.edit_pattern(), 7);
    }

    #[test]
    fn song_slot_grows_the_chain() {
        let state = SharedState::default();
        state.set_song_slot(4, 2, 3);
        assert_eq!(state.chain_length(), 5);
        assert_eq!(state.slot(4), SongSlot { pattern: 2, repeat: 3 });
        state.set_song_slot(1, 9, 0);
        assert_eq!(state.chain_length(), 5);
        assert_eq!(state.slot(1), SongSlot { pattern: 7, repeat: 1 });
        state.set_song_length(0);
        assert_eq!(state.chain_length(), 1);
    }

    #[test]
    fn transport_controls() {
        let state = SharedState::default();
        state.toggle_play();
        assert!(state.is_playing());
        state.toggle_play();
        assert!(!state.is_playing());
        state.play();
        state.stop();
        assert!(!state.is_playing());
        state.request_next();
        assert!(state.next_requested());
        state.clear_next_request();
        assert!(!state.next_requested());
    }

    #[test]
    fn parameters_by_name() {
        let state = SharedState::default();
        state.set_parameter("bpm", 140.0).unwrap();
        state.set_parameter("pad_mute", 1.0).unwrap();
        let snap = state.params().snapshot();
        assert_eq!(snap.bpm, 140.0);
        assert!(snap.track(Track::Pad).mute);
        assert!(matches!(
            state.set_parameter("flanger", 0.5),
            Err(ObstacleError::UnknownParameter(_))
        ));
    }

    #[test]
    fn randomize_writes_the_edit_pattern() {
        let state = SharedState::new(ParamValues::default(), 99);
        state.select_edit_pattern(2);
        let pat = state.randomize_edit_pattern();
        assert_eq!(state.pattern(2), pat);
        assert_eq!(state.pattern(0), Pattern::default_groove());
    }
}
