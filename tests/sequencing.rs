use std::sync::Arc;

use obstacle_core::config::EngineConfig;
use obstacle_core::midi::{MidiBuffer, MidiMessage};
use obstacle_core::pattern::{Pattern, Track};
use obstacle_core::persist::{self, Session};
use obstacle_core::processor::Processor;
use obstacle_core::song::{SongChain, SongCursor, SongSlot};
use obstacle_core::state::SharedState;
use obstacle_core::telemetry::{TelemetryEvent, TelemetryWatcher};

const SR: f32 = 48000.0;
/// 200 bpm at 48 kHz.
const STEP: usize = 3600;
const BAR: usize = STEP * 16;

fn engine(state: &Arc<SharedState>) -> Processor {
    state.set_parameter("bpm", 200.0).unwrap();
    Processor::new(EngineConfig::with_sample_rate(SR), Arc::clone(state)).unwrap()
}

type Sent = (usize, u8, MidiMessage);

/// Render `n` samples in 256-sample blocks, returning the left channel and
/// every MIDI event with its absolute position and channel.
fn play(p: &mut Processor, n: usize) -> (Vec<f32>, Vec<Sent>) {
    let mut out = Vec::with_capacity(n);
    let mut events = Vec::new();
    let mut midi = MidiBuffer::with_capacity(256);
    let mut left = [0.0f32; 256];
    let mut right = [0.0f32; 256];
    let mut pos = 0;
    while pos < n {
        let len = 256.min(n - pos);
        p.process_block(&mut left[..len], &mut right[..len], None, &mut midi);
        assert_eq!(left[..len], right[..len]);
        out.extend_from_slice(&left[..len]);
        events.extend(
            midi.events()
                .iter()
                .map(|e| (pos + e.sample_offset, e.channel.as_int(), e.message)),
        );
        pos += len;
    }
    (out, events)
}

/// A single kick on the downbeat.
fn marker_pattern() -> Pattern {
    let mut pat = Pattern::default();
    pat.set_step(Track::Kick, 0, true);
    pat
}

#[test]
fn chain_repeats_are_honoured_in_order() {
    let state = Arc::new(SharedState::default());
    for i in 0..3 {
        state.store_pattern(i, &marker_pattern());
    }
    state.store_chain(&SongChain::from_slots(
        &[SongSlot::new(0, 2), SongSlot::new(1, 1), SongSlot::new(2, 3)],
        true,
    ));
    let mut p = engine(&state);
    state.play();

    let mut played = Vec::new();
    for bar in 0..12 {
        // One sample into each bar: step 0 has fired.
        let n = if bar == 0 { 1 } else { BAR };
        play(&mut p, n);
        played.push(state.play_pattern());
    }
    assert_eq!(played, vec![0, 0, 1, 2, 2, 2, 0, 0, 1, 2, 2, 2]);
}

#[test]
fn cursor_walk_matches_chain_period() {
    let chain = SongChain::from_slots(
        &[SongSlot::new(0, 2), SongSlot::new(1, 1), SongSlot::new(2, 3)],
        true,
    );
    let mut cursor = SongCursor::new();
    let mut visits = [0usize; 3];
    for _ in 0..6 {
        cursor.on_bar_start(&chain, false);
        visits[cursor.slot()] += 1;
    }
    assert_eq!(visits, [2, 1, 3]);
}

#[test]
fn loop_off_stops_after_last_slot() {
    let state = Arc::new(SharedState::default());
    state.store_chain(&SongChain::from_slots(
        &[SongSlot::new(0, 1), SongSlot::new(0, 1)],
        false,
    ));
    let mut p = engine(&state);
    state.play();

    let (audio, events) = play(&mut p, 3 * BAR);
    assert!(!state.is_playing());
    assert_eq!(state.play_slot(), 0);
    assert_eq!(state.current_step(), -1);

    // Stopped on the third bar's first sample.
    let stop_at = 2 * BAR;
    assert!(audio[stop_at..].iter().all(|&s| s == 0.0));
    let offs: Vec<_> = events
        .iter()
        .filter(|(_, _, m)| matches!(m, MidiMessage::Controller { .. }))
        .map(|(at, _, _)| *at)
        .collect();
    assert_eq!(offs, vec![stop_at; 6]);
}

#[test]
fn notes_never_overlap_on_a_channel() {
    let state = Arc::new(SharedState::default());
    let mut p = engine(&state);
    state.play();
    let (_, events) = play(&mut p, 2 * BAR);
    assert!(!events.is_empty());

    let mut sounding: [Option<u8>; 6] = [None; 6];
    for (_, channel, message) in &events {
        let ch = *channel as usize;
        match message {
            MidiMessage::NoteOn { key, .. } => {
                assert_eq!(sounding[ch], None, "overlapping note on channel {ch}");
                sounding[ch] = Some(key.as_int());
            }
            MidiMessage::NoteOff { key, .. } => {
                assert_eq!(sounding[ch], Some(key.as_int()), "unpaired note-off on channel {ch}");
                sounding[ch] = None;
            }
            _ => {}
        }
    }
}

#[test]
fn session_round_trip_through_shared_state() {
    let state = Arc::new(SharedState::default());
    state.select_edit_pattern(4);
    state.randomize_edit_pattern();
    state.set_note_degree(Track::Lead.index(), 3, 5);
    state.set_song_slot(0, 4, 3);
    state.set_song_slot(5, 1, 8);
    state.set_loop_mode(false);
    state.set_parameter("cutoff", 3100.0).unwrap();
    state.set_parameter("snare_mute", 1.0).unwrap();
    state.set_parameter("key", -5.0).unwrap();

    let bytes = persist::save_state(&state).unwrap();
    let restored = SharedState::default();
    persist::load_state(&restored, &bytes).unwrap();

    assert_eq!(Session::capture(&restored), Session::capture(&state));
    assert_eq!(restored.play_pattern(), 4);
}

#[test]
fn output_is_always_in_range() {
    let state = Arc::new(SharedState::default());
    for i in 0..8 {
        let mut pat = Pattern::default();
        for track in Track::ALL {
            for s in 0..16 {
                pat.set_step(track, s, true);
            }
        }
        state.store_pattern(i, &pat);
    }
    for name in ["master_volume", "kick_volume", "snare_volume", "bass_volume", "lead_volume", "pad_volume"] {
        state.set_parameter(name, 1.5).unwrap();
    }
    state.set_parameter("drive", 0.5).unwrap();
    state.set_parameter("delay_feedback", 0.9).unwrap();
    state.set_parameter("delay", 0.9).unwrap();
    state.set_parameter("reverb", 1.0).unwrap();
    state.set_parameter("cutoff", 20000.0).unwrap();

    let mut p = engine(&state);
    state.play();
    let (audio, _) = play(&mut p, 2 * BAR);
    assert!(audio.iter().all(|s| s.is_finite() && (-1.0..=1.0).contains(s)));
    assert!(audio.iter().any(|&s| s.abs() > 0.1));
}

#[test]
fn telemetry_follows_playback() {
    let state = Arc::new(SharedState::default());
    let mut p = engine(&state);
    let mut watcher = TelemetryWatcher::new();
    watcher.poll(&state);

    state.play();
    play(&mut p, STEP + 1);
    let events = watcher.poll(&state);
    assert!(events.contains(&TelemetryEvent::Step { step: 1 }));
    assert!(events.contains(&TelemetryEvent::PlayState { playing: true }));

    state.stop();
    play(&mut p, 16);
    assert_eq!(
        watcher.poll(&state),
        vec![
            TelemetryEvent::Step { step: -1 },
            TelemetryEvent::PlayState { playing: false },
        ]
    );
}
