//! End-to-end session scenarios on hand-driven time.

use lanebeat::chart::generator::GeneratorSpec;
use lanebeat::chart::timing::NoteOnset;
use lanebeat::chart::{ChartData, ChartTimingModel, Schedule};
use lanebeat::logic::audio::AudioPosition;
use lanebeat::logic::autoplay::AutoPlayer;
use lanebeat::logic::event_log::{EngineEvent, IgnoreReason};
use lanebeat::logic::run_simulated;
use lanebeat::system::bus::EngineBus;
use lanebeat::{
    Chart, EngineConfig, EngineError, GameSession, Grade, InputEvent, Judgment, Lane, LaneSet,
    ManualTime, Measure, SessionState,
};
use std::cell::Cell;
use std::rc::Rc;

const TICK_MS: f64 = 1000.0 / 60.0;

fn quarter_note_chart() -> Chart {
    Chart {
        bpm: 120.0,
        subdivision: 4,
        beats_per_measure: 4,
        offset_seconds: 2.0,
        measures: vec![Measure::new("1111", "0000")],
    }
}

fn new_session() -> (GameSession, ManualTime) {
    let time = ManualTime::new();
    let session = GameSession::new(EngineConfig::default(), Box::new(time.clone()));
    (session, time)
}

/// Ticks until the session clock reaches `target_ms`.
fn run_until(session: &mut GameSession, time: &ManualTime, target_ms: f64) {
    while session.song_time_ms() < target_ms && session.is_active() {
        time.advance(TICK_MS);
        session.tick();
    }
}

#[test]
fn test_quarter_notes_are_scheduled_on_the_beat() {
    let schedule = ChartTimingModel::from_config(&EngineConfig::default())
        .build_schedule(&ChartData::Grid(quarter_note_chart()))
        .unwrap();

    let hits: Vec<f64> = schedule.notes.iter().map(|n| n.hit_time_ms).collect();
    assert_eq!(hits, vec![2000.0, 2500.0, 3000.0, 3500.0]);
    let spawns: Vec<f64> = schedule.notes.iter().map(|n| n.spawn_time_ms).collect();
    assert_eq!(spawns, vec![0.0, 500.0, 1000.0, 1500.0]);
    assert!(schedule.dropped.is_empty());
}

#[test]
fn test_press_without_target_is_a_no_op() {
    let (mut session, time) = new_session();
    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();
    run_until(&mut session, &time, 1000.0);

    let before = session.score_state().clone();
    assert_eq!(session.press(Lane::Bottom, 1000.0), None);
    assert_eq!(session.score_state(), &before);
    assert_eq!(session.live_notes().count(), 3);
}

#[test]
fn test_unpressed_note_is_missed_exactly_once() {
    let (mut session, time) = new_session();
    session
        .start(&ChartData::Grid(Chart {
            measures: vec![Measure::new("1000", "0000")],
            ..quarter_note_chart()
        }))
        .unwrap();

    run_until(&mut session, &time, 3000.0);
    assert_eq!(session.score_state().counts.miss, 1);
    assert_eq!(session.score_state().combo, 0);

    run_until(&mut session, &time, 5000.0);
    assert_eq!(session.score_state().counts.miss, 1);
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(session.result().unwrap().grade, Grade::D);
}

#[test]
fn test_full_hold_scores_start_progress_and_bonus() {
    let (mut session, time) = new_session();
    let schedule = ChartTimingModel::from_config(session.config()).schedule(
        vec![NoteOnset::hold(3000.0, LaneSet::Top, 1000.0, 0.5)],
        120.0,
        0.0,
    );
    session.start_schedule(schedule).unwrap();

    run_until(&mut session, &time, 3000.0);
    assert_eq!(session.press(Lane::Top, 3000.0), Some(Judgment::Perfect));
    assert_eq!(session.score_state().combo, 1);
    assert!(session.active_hold(Lane::Top).is_some());

    run_until(&mut session, &time, 4100.0);
    let score = session.score_state();
    assert!(session.active_hold(Lane::Top).is_none());
    // 300 start, 100 progressive, 500 bonus.
    assert_eq!(score.total_score, 900);
    assert_eq!(score.combo, 2);
    assert_eq!(score.counts.hold, 1);
    assert_eq!(score.counts.perfect, 1);
}

#[test]
fn test_stop_is_idempotent() {
    let (mut session, time) = new_session();
    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();
    run_until(&mut session, &time, 2000.0);
    session.press(Lane::Top, 2000.0);

    session.stop();
    let first = session.result().cloned().unwrap();
    assert_eq!(first.state, SessionState::Stopped);
    assert_eq!(session.live_notes().count(), 0);

    session.stop();
    time.advance(5000.0);
    session.tick();
    assert_eq!(session.result(), Some(&first));
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn test_input_outside_a_run_is_logged_and_ignored() {
    let (mut session, time) = new_session();
    assert_eq!(session.press(Lane::Top, 0.0), None);

    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();
    run_until(&mut session, &time, 1900.0);
    session.pause().unwrap();
    assert_eq!(session.press(Lane::Top, 2000.0), None);
    assert_eq!(session.score_state().counts.total_judged(), 0);

    let ignored = session.event_log().count(|e| {
        matches!(
            e,
            EngineEvent::InputIgnored {
                reason: IgnoreReason::OutOfSession,
                ..
            }
        )
    });
    // The press before start was cleared with the log when the run began.
    assert_eq!(ignored, 1);
}

#[test]
fn test_pause_and_resume_only_from_valid_states() {
    let (mut session, time) = new_session();
    assert!(matches!(
        session.pause(),
        Err(EngineError::InvalidTransition { .. })
    ));

    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();
    run_until(&mut session, &time, 500.0);
    session.pause().unwrap();
    let paused_at = session.song_time_ms();

    time.advance(10_000.0);
    session.tick();
    assert_eq!(session.song_time_ms(), paused_at);
    assert!(session.pause().is_err());

    session.resume().unwrap();
    time.advance(TICK_MS);
    session.tick();
    assert!((session.song_time_ms() - (paused_at + TICK_MS)).abs() < 1e-6);
    // No note was swept during the pause.
    assert_eq!(session.score_state().counts.miss, 0);
}

#[test]
fn test_invalid_chart_leaves_session_idle() {
    let (mut session, _time) = new_session();
    let bad = Chart {
        measures: vec![Measure::new("111", "0000")],
        ..quarter_note_chart()
    };
    assert!(matches!(
        session.start(&ChartData::Grid(bad)),
        Err(EngineError::Chart(_))
    ));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_autoplay_clears_a_generated_chart_with_s() {
    let (mut session, time) = new_session();
    session
        .start(&ChartData::Generated(GeneratorSpec {
            bpm: 120.0,
            duration_ms: 30_000.0,
            offset_ms: 2000.0,
        }))
        .unwrap();
    let schedule = session.schedule().cloned().unwrap();
    assert!(!schedule.is_empty());

    let script = AutoPlayer::new(15.0, 42).script(&schedule);
    let result = run_simulated(&mut session, &time, script).unwrap();

    assert_eq!(result.state, SessionState::Finished);
    assert_eq!(result.counts.miss, 0);
    assert_eq!(result.grade, Grade::S);
    assert_eq!(result.counts.hold as usize, count_hold_lanes(&schedule));
    assert!(result.max_combo > 0);
}

fn count_hold_lanes(schedule: &lanebeat::Schedule) -> usize {
    schedule
        .notes
        .iter()
        .filter(|n| n.is_hold())
        .map(|n| n.lanes.lanes().len())
        .sum()
}

fn top_taps(session: &GameSession, hits: &[f64]) -> Schedule {
    let onsets = hits
        .iter()
        .map(|&t| NoteOnset::tap(t, LaneSet::Top, 0.5))
        .collect();
    ChartTimingModel::from_config(session.config()).schedule(onsets, 120.0, 0.0)
}

#[test]
fn test_release_during_pause_lifts_the_lane() {
    let (mut session, time) = new_session();
    let schedule = top_taps(&session, &[3000.0, 4000.0]);
    session.start_schedule(schedule).unwrap();

    run_until(&mut session, &time, 3000.0);
    assert_eq!(session.press(Lane::Top, 3000.0), Some(Judgment::Perfect));
    session.pause().unwrap();
    session.release(Lane::Top, 3040.0);
    time.advance(2000.0);
    session.resume().unwrap();

    run_until(&mut session, &time, 4000.0);
    assert_eq!(session.press(Lane::Top, 4000.0), Some(Judgment::Perfect));
    let score = session.score_state();
    assert_eq!(score.counts.perfect, 2);
    assert_eq!(score.counts.miss, 0);
    assert_eq!(score.combo, 2);
}

#[test]
fn test_hold_released_during_pause_is_judged_at_pause_time() {
    let (mut session, time) = new_session();
    let schedule = ChartTimingModel::from_config(session.config()).schedule(
        vec![NoteOnset::hold(3000.0, LaneSet::Top, 1000.0, 0.5)],
        120.0,
        0.0,
    );
    session.start_schedule(schedule).unwrap();

    run_until(&mut session, &time, 3000.0);
    session.press(Lane::Top, 3000.0);
    run_until(&mut session, &time, 3200.0);
    session.pause().unwrap();
    time.advance(5000.0);
    assert_eq!(session.release(Lane::Top, 8200.0), Some(Judgment::Miss));
    assert!(session.active_hold(Lane::Top).is_none());

    session.resume().unwrap();
    run_until(&mut session, &time, 4500.0);
    let score = session.score_state();
    assert_eq!(score.counts.hold, 0);
    assert_eq!(score.counts.miss, 1);
    assert_eq!(score.combo, 0);
    // 300 start plus two progressive increments.
    assert_eq!(score.total_score, 320);
}

#[test]
fn test_queued_press_wins_over_the_sweep_and_logs_a_race() {
    let bus = EngineBus::new();
    let time = ManualTime::new();
    let mut session = GameSession::new(EngineConfig::default(), Box::new(time.clone()))
        .with_input_queue(bus.input_queue());
    let schedule = top_taps(&session, &[3000.0]);
    session.start_schedule(schedule).unwrap();

    run_until(&mut session, &time, 3200.0);
    bus.input_tx.send(InputEvent::press(Lane::Top, 3250.0)).unwrap();
    // The sweep at 3300 ms would take the note; the press is applied first.
    time.set(3300.0);
    session.tick();

    let score = session.score_state();
    assert_eq!(score.counts.good, 1);
    assert_eq!(score.counts.miss, 0);
    let races = session
        .event_log()
        .count(|e| matches!(e, EngineEvent::ResolutionRace { lane: Lane::Top, .. }));
    assert_eq!(races, 1);
}

#[test]
fn test_queued_input_is_applied_in_timestamp_order() {
    let bus = EngineBus::new();
    let time = ManualTime::new();
    let mut session = GameSession::new(EngineConfig::default(), Box::new(time.clone()))
        .with_input_queue(bus.input_queue());
    let schedule = top_taps(&session, &[3000.0]);
    session.start_schedule(schedule).unwrap();

    run_until(&mut session, &time, 2990.0);
    bus.input_tx.send(InputEvent::release(Lane::Top, 3040.0)).unwrap();
    bus.input_tx.send(InputEvent::press(Lane::Top, 3000.0)).unwrap();
    run_until(&mut session, &time, 3050.0);

    assert_eq!(session.score_state().counts.perfect, 1);
    assert_eq!(
        session
            .event_log()
            .count(|e| matches!(e, EngineEvent::InputIgnored { .. })),
        0
    );
    assert_eq!(session.snapshot().keys_held, [false, false]);
}

#[test]
fn test_input_offset_shifts_judging() {
    let mut config = EngineConfig::default();
    config.session.input_offset_ms = -100.0;
    let time = ManualTime::new();
    let mut shifted = GameSession::new(config, Box::new(time.clone()));
    let schedule = top_taps(&shifted, &[3000.0]);
    shifted.start_schedule(schedule.clone()).unwrap();
    run_until(&mut shifted, &time, 3100.0);
    assert_eq!(shifted.press(Lane::Top, 3100.0), Some(Judgment::Perfect));

    let (mut plain, time) = new_session();
    plain.start_schedule(schedule).unwrap();
    run_until(&mut plain, &time, 3100.0);
    assert_eq!(plain.press(Lane::Top, 3100.0), Some(Judgment::Great));
}

#[test]
fn test_progress_and_snapshot_follow_the_run() {
    let (mut session, time) = new_session();
    assert_eq!(session.progress_percent(), 0.0);
    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();

    // The last note ends at 3500 ms.
    run_until(&mut session, &time, 1750.0);
    assert!((session.progress_percent() - 50.0).abs() < 1.0);
    let snap = session.snapshot();
    assert_eq!(snap.state, SessionState::Running);
    assert_eq!(snap.notes.len(), 4);
    assert_eq!(snap.remaining_notes, 4);
    assert_eq!(snap.keys_held, [false, false]);
    assert_eq!(snap.timing.bpm, 120.0);

    run_until(&mut session, &time, 2000.0);
    session.press(Lane::Top, 2000.0);
    let snap = session.snapshot();
    assert_eq!(snap.keys_held, [true, false]);
    assert_eq!(snap.last_judgment, Some(Judgment::Perfect));
    assert_eq!(snap.score.total_score, 300);
    assert_eq!(snap.remaining_notes, 3);

    run_until(&mut session, &time, 10_000.0);
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(session.progress_percent(), 100.0);
}

/// Audio position set by hand.
struct FakeAudio(Rc<Cell<Option<f64>>>);

impl AudioPosition for FakeAudio {
    fn position_ms(&self) -> Option<f64> {
        self.0.get()
    }
}

#[test]
fn test_audio_resync_snaps_without_moving_song_time_back() {
    let audio = Rc::new(Cell::new(None));
    let time = ManualTime::new();
    let mut session = GameSession::new(EngineConfig::default(), Box::new(time.clone()))
        .with_audio(Box::new(FakeAudio(audio.clone())));
    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();

    time.advance(1000.0);
    audio.set(Some(1200.0));
    session.tick();
    assert!((session.song_time_ms() - 1200.0).abs() < 1e-6);

    // Audio jumps backwards; the clock follows but song time holds.
    time.advance(TICK_MS);
    audio.set(Some(900.0));
    session.tick();
    assert!((session.song_time_ms() - 1200.0).abs() < 1e-6);

    let snaps = session
        .event_log()
        .count(|e| matches!(e, EngineEvent::AudioResync { snapped: true, .. }));
    assert_eq!(snaps, 2);
}

fn tone(amplitude: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * 60.0 * i as f32 / 44100.0).sin())
        .collect()
}

#[test]
fn test_energy_spikes_are_logged_as_beat_candidates() {
    let (session, time) = new_session();
    let mut session = session.with_energy_detector(44100);
    session.start(&ChartData::Grid(quarter_note_chart())).unwrap();
    time.advance(100.0);
    session.tick();

    let quiet = tone(0.1, 1024);
    for _ in 0..43 {
        session.feed_audio_samples(&quiet);
    }
    session.feed_audio_samples(&tone(0.9, 1024));

    let candidates = session
        .event_log()
        .count(|e| matches!(e, EngineEvent::BeatCandidate { .. }));
    assert_eq!(candidates, 1);
    assert_eq!(session.score_state().counts.total_judged(), 0);
}
