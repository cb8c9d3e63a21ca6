//! Session drivers.
//!
//! A driver owns the loop around a `GameSession`: it moves time forward,
//! delivers input and ticks at a fixed rate until the run is over. The
//! real-time driver runs against the wall clock with input and playback
//! threads; the simulated driver steps a `ManualTime` as fast as it can.

pub mod audio;
pub mod autoplay;
pub mod clock;
pub mod energy;
pub mod event_log;

use crate::chart::timing::Schedule;
use crate::error::{EngineError, SessionState};
use crate::input::events::{InputAction, InputEvent};
use crate::logic::audio::{AudioPositionWriter, SharedAudioPosition};
use crate::logic::clock::{ManualTime, MonotonicTime};
use crate::models::settings::EngineConfig;
use crate::shared::presenter::Presenter;
use crate::shared::snapshot::SessionResult;
use crate::state::GameSession;
use crate::system::bus::EngineBus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Song time past the expected finish after which a simulated run is cut.
const RUNAWAY_MARGIN_MS: f64 = 10_000.0;

/// Drives a started session on hand-stepped time.
///
/// Each step advances `time` by one tick period, delivers every scripted
/// event due by then, and ticks. Runs until the session finishes; a session
/// that somehow never finishes is stopped once song time runs well past the
/// end of the chart.
pub fn run_simulated(
    session: &mut GameSession,
    time: &ManualTime,
    mut script: Vec<InputEvent>,
) -> Result<SessionResult, EngineError> {
    if session.state() != SessionState::Running {
        return Err(EngineError::InvalidTransition {
            action: "drive",
            state: session.state(),
        });
    }
    let dt = 1000.0 / session.config().session.tick_rate_hz as f64;
    let cutoff = session
        .schedule()
        .map_or(0.0, |s| s.last_end_ms() + session.config().session.finish_grace_ms)
        + RUNAWAY_MARGIN_MS;

    script.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
    let mut pending = script.into_iter().peekable();
    let mut ticks: u64 = 0;

    while session.is_active() {
        time.advance(dt);
        let horizon = session.song_time_ms() + dt;
        while let Some(event) = pending.next_if(|e| e.timestamp_ms <= horizon) {
            match event.action {
                InputAction::Press => session.press(event.lane, event.timestamp_ms),
                InputAction::Release => session.release(event.lane, event.timestamp_ms),
            };
        }
        session.tick();
        ticks += 1;

        if session.song_time_ms() > cutoff {
            log::warn!(
                "DRIVER: Session still running at {:.0} ms, stopping",
                session.song_time_ms()
            );
            session.stop();
        }
    }

    log::debug!("DRIVER: Simulated run took {} ticks", ticks);
    finished_result(session)
}

/// Plays `schedule` against the wall clock.
///
/// Input comes from a scripted input thread through the engine bus, and a
/// silent playback thread publishes the audio position the session resyncs
/// to. The session ticks on a fixed timestep.
pub fn run_realtime(
    config: EngineConfig,
    schedule: Schedule,
    script: Vec<InputEvent>,
    presenter: Box<dyn Presenter>,
) -> Result<SessionResult, EngineError> {
    let bus = EngineBus::new();
    let tick_rate = config.session.tick_rate_hz;

    let mut session = GameSession::new(config, Box::new(MonotonicTime::new()))
        .with_presenter(presenter)
        .with_audio(Box::new(SharedAudioPosition::new(&bus)))
        .with_input_queue(bus.input_queue());
    session.start_schedule(schedule)?;

    let origin = Instant::now();
    let stop_audio = Arc::new(AtomicBool::new(false));
    let audio = crate::logic::audio::start_silent_playback(
        AudioPositionWriter::new(&bus),
        origin,
        stop_audio.clone(),
    )?;
    let input = crate::input::start_thread(script, bus.input_tx.clone(), origin)?;

    log::info!("DRIVER: Real-time session running at {} TPS", tick_rate);

    let mut accumulator = Duration::new(0, 0);
    let mut last_time = Instant::now();
    let target_dt = Duration::from_secs_f64(1.0 / tick_rate as f64);

    while session.is_active() {
        let current_time = Instant::now();
        let delta = current_time - last_time;
        last_time = current_time;
        accumulator += delta;

        let mut loops = 0;
        while accumulator >= target_dt && loops < 10 {
            session.tick();
            accumulator -= target_dt;
            loops += 1;
        }

        if loops == 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    stop_audio.store(true, Ordering::Relaxed);
    if audio.join().is_err() {
        log::error!("DRIVER: Audio thread panicked");
    }
    // Scripted events end before the finish grace runs out; a late one is
    // left to the detached thread.
    if input.is_finished() && input.join().is_err() {
        log::error!("DRIVER: Input thread panicked");
    }

    finished_result(&session)
}

fn finished_result(session: &GameSession) -> Result<SessionResult, EngineError> {
    session
        .result()
        .cloned()
        .ok_or(EngineError::InvalidTransition {
            action: "conclude",
            state: session.state(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::timing::{ChartTimingModel, NoteOnset};
    use crate::logic::autoplay::AutoPlayer;
    use crate::models::chart::LaneSet;
    use crate::models::stats::Grade;

    fn schedule() -> Schedule {
        ChartTimingModel::new(2000.0, 100.0).schedule(
            vec![
                NoteOnset::tap(2500.0, LaneSet::Top, 0.5),
                NoteOnset::tap(3000.0, LaneSet::Both, 0.5),
                NoteOnset::hold(3500.0, LaneSet::Bottom, 600.0, 0.5),
            ],
            120.0,
            0.0,
        )
    }

    fn session(time: &ManualTime) -> GameSession {
        let mut session = GameSession::new(EngineConfig::default(), Box::new(time.clone()));
        session.start_schedule(schedule()).unwrap();
        session
    }

    #[test]
    fn test_simulated_autoplay_finishes_with_s() {
        let time = ManualTime::new();
        let mut session = session(&time);
        let script = AutoPlayer::perfect().script(&schedule());

        let result = run_simulated(&mut session, &time, script).unwrap();
        assert_eq!(result.state, SessionState::Finished);
        assert_eq!(result.grade, Grade::S);
        assert_eq!(result.counts.miss, 0);
        assert_eq!(result.counts.hold, 1);
        assert!(result.song_time_ms >= 4100.0 + 2000.0);
    }

    #[test]
    fn test_simulated_without_input_misses_everything() {
        let time = ManualTime::new();
        let mut session = session(&time);

        let result = run_simulated(&mut session, &time, Vec::new()).unwrap();
        assert_eq!(result.state, SessionState::Finished);
        // The dual note counts once per lane.
        assert_eq!(result.counts.miss, 4);
        assert_eq!(result.grade, Grade::D);
        assert_eq!(result.total_score, 0);
    }

    #[test]
    fn test_simulated_requires_running_session() {
        let time = ManualTime::new();
        let mut session = GameSession::new(EngineConfig::default(), Box::new(time.clone()));
        assert!(matches!(
            run_simulated(&mut session, &time, Vec::new()),
            Err(EngineError::InvalidTransition { .. })
        ));
    }
}
