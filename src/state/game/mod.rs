//! Play session controller.
//!
//! The `GameSession` owns one run of one chart:
//! - Session lifecycle (start, pause, resume, stop, finish)
//! - The per-tick pass: input, spawn, advance, holds, misses
//! - Audio resynchronization and beat events
//! - Grading at the end of the run

mod input;
mod notes;
mod snapshot;

pub use input::{JudgmentEngine, PressOutcome};
pub use notes::{LifecycleEvent, NoteLifecycle};

use crate::chart::source::{ChartData, ChartSource};
use crate::chart::timing::{ChartTimingModel, Schedule};
use crate::error::{EngineError, SessionState};
use crate::input::events::{InputAction, InputEvent, InputQueue, LaneLatch};
use crate::logic::audio::AudioPosition;
use crate::logic::clock::{BeatEvent, Clock, TimeSource, TimingInfo};
use crate::logic::energy::EnergyBeatDetector;
use crate::logic::event_log::{EngineEvent, EventLog, IgnoreReason};
use crate::models::chart::Lane;
use crate::models::engine::LiveNote;
use crate::models::settings::EngineConfig;
use crate::models::stats::{Grade, Judgment, ScoreState};
use crate::shared::presenter::{NullPresenter, Presenter};
use crate::shared::snapshot::SessionResult;
use std::collections::VecDeque;

/// Window over which presses count toward notes per second.
const NPS_WINDOW_MS: f64 = 1000.0;

pub struct GameSession {
    config: EngineConfig,
    timing: ChartTimingModel,
    judge: JudgmentEngine,
    clock: Clock,
    state: SessionState,

    schedule: Option<Schedule>,
    lifecycle: NoteLifecycle,
    score: ScoreState,
    latch: LaneLatch,

    input: Option<InputQueue>,
    presenter: Box<dyn Presenter>,
    audio: Option<Box<dyn AudioPosition>>,
    energy: Option<EnergyBeatDetector>,
    events: EventLog,

    /// Song time seen by the lifecycle; never decreases within a run.
    song_time_ms: f64,
    result: Option<SessionResult>,
    last_judgment: Option<Judgment>,
    beats_fired: u64,

    /// Timestamps of recent presses for NPS calculation.
    input_timestamps: VecDeque<f64>,
    current_nps: f64,
}

impl GameSession {
    pub fn new(config: EngineConfig, time: Box<dyn TimeSource>) -> Self {
        let clock = Clock::new(time, config.clock);
        Self {
            timing: ChartTimingModel::from_config(&config),
            judge: JudgmentEngine::from_config(&config),
            lifecycle: NoteLifecycle::new(config.playfield, config.scoring),
            clock,
            config,
            state: SessionState::Idle,
            schedule: None,
            score: ScoreState::new(),
            latch: LaneLatch::new(),
            input: None,
            presenter: Box::new(NullPresenter::new()),
            audio: None,
            energy: None,
            events: EventLog::new(),
            song_time_ms: 0.0,
            result: None,
            last_judgment: None,
            beats_fired: 0,
            input_timestamps: VecDeque::new(),
            current_nps: 0.0,
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_audio(mut self, audio: Box<dyn AudioPosition>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_input_queue(mut self, queue: InputQueue) -> Self {
        self.input = Some(queue);
        self
    }

    /// Enables diagnostic energy analysis of samples passed to
    /// [`GameSession::feed_audio_samples`].
    pub fn with_energy_detector(mut self, sample_rate: u32) -> Self {
        self.energy = Some(EnergyBeatDetector::new(sample_rate));
        self
    }

    /// Registers a beat callback on the session clock.
    pub fn on_beat(&mut self, callback: impl FnMut(&BeatEvent) + 'static) {
        self.clock.on_beat(callback);
    }

    /// Loads chart data from a source and starts.
    pub fn start_from(&mut self, source: &dyn ChartSource) -> Result<(), EngineError> {
        let data = source.load()?;
        self.start(&data)
    }

    /// Schedules `data` and starts a fresh run.
    ///
    /// Valid from idle, stopped or finished. A chart that fails validation
    /// leaves the session untouched.
    pub fn start(&mut self, data: &ChartData) -> Result<(), EngineError> {
        if matches!(self.state, SessionState::Running | SessionState::Paused) {
            return Err(EngineError::InvalidTransition {
                action: "start",
                state: self.state,
            });
        }
        let schedule = self.timing.build_schedule(data)?;
        self.start_schedule(schedule)
    }

    /// Starts a run from an already built schedule.
    pub fn start_schedule(&mut self, schedule: Schedule) -> Result<(), EngineError> {
        if matches!(self.state, SessionState::Running | SessionState::Paused) {
            return Err(EngineError::InvalidTransition {
                action: "start",
                state: self.state,
            });
        }

        self.lifecycle.reset(self.presenter.as_mut());
        self.score = ScoreState::new();
        self.latch.reset();
        self.events.clear();
        self.result = None;
        self.last_judgment = None;
        self.beats_fired = 0;
        self.song_time_ms = 0.0;
        self.input_timestamps.clear();
        self.current_nps = 0.0;
        if let Some(energy) = self.energy.as_mut() {
            energy.reset();
        }
        if let Some(queue) = &self.input {
            // Anything queued before the run belongs to no session.
            for event in queue.drain_ordered() {
                self.events.record(0.0, ignored(event, IgnoreReason::OutOfSession));
            }
        }

        for note in &schedule.dropped {
            self.events.record(
                0.0,
                EngineEvent::NoteDropped {
                    hit_time_ms: note.hit_time_ms,
                    spawn_time_ms: note.spawn_time_ms,
                    lanes: note.lanes,
                },
            );
        }

        self.clock.set_tempo(schedule.bpm, schedule.first_beat_ms);
        self.clock.start();
        log::info!(
            "SESSION: Started with {} notes over {:.1} s",
            schedule.len(),
            schedule.duration_ms() / 1000.0
        );
        self.schedule = Some(schedule);
        self.state = SessionState::Running;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        if self.state != SessionState::Running {
            return Err(EngineError::InvalidTransition {
                action: "pause",
                state: self.state,
            });
        }
        self.clock.pause();
        self.state = SessionState::Paused;
        log::info!("SESSION: Paused at {:.1} ms", self.song_time_ms);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        if self.state != SessionState::Paused {
            return Err(EngineError::InvalidTransition {
                action: "resume",
                state: self.state,
            });
        }
        self.clock.resume();
        self.state = SessionState::Running;
        log::info!("SESSION: Resumed at {:.1} ms", self.song_time_ms);
        Ok(())
    }

    /// Ends the run early. Live notes and holds are dropped unjudged and the
    /// score is frozen. Calling it again, or outside a run, does nothing.
    pub fn stop(&mut self) {
        if !matches!(self.state, SessionState::Running | SessionState::Paused) {
            return;
        }
        self.clock.stop();
        self.lifecycle.clear(self.presenter.as_mut());
        self.latch.reset();
        self.conclude(SessionState::Stopped);
    }

    fn conclude(&mut self, state: SessionState) {
        self.state = state;
        let accuracy = self.score.accuracy();
        let result = SessionResult {
            state,
            total_score: self.score.total_score,
            max_combo: self.score.max_combo,
            counts: self.score.counts,
            accuracy,
            grade: Grade::from_accuracy(accuracy),
            song_time_ms: self.song_time_ms,
            dropped_notes: self.schedule.as_ref().map_or(0, |s| s.dropped.len()),
        };
        log::info!(
            "SESSION: {} with score {} grade {} (max combo {})",
            state,
            result.total_score,
            result.grade,
            result.max_combo
        );
        self.result = Some(result);
    }

    /// Runs one tick.
    ///
    /// Queued input is applied first, in timestamp order, so a press that
    /// reaches a note before this tick's miss sweep wins over the sweep.
    pub fn tick(&mut self) {
        if self.state != SessionState::Running {
            self.discard_queued_input();
            return;
        }
        let now = self.advance_time();

        if self.clock.poll_beats().is_some() {
            self.beats_fired += 1;
        }

        let queued = self.input.as_ref().map(InputQueue::drain_ordered);
        for event in queued.into_iter().flatten() {
            self.apply_input(event, now);
        }

        let Some(schedule) = self.schedule.as_ref() else {
            return;
        };
        let presenter = self.presenter.as_mut();
        self.lifecycle
            .spawn_due(schedule, now, presenter, &mut self.events);
        self.lifecycle.advance(now, presenter);

        let hold_events = self.lifecycle.process_holds(now, presenter);
        let miss_events = self.lifecycle.sweep_misses(now, presenter);
        for events in [hold_events, miss_events] {
            if let Some(j) =
                self.judge
                    .apply_events(&events, &mut self.lifecycle, &mut self.score, presenter)
            {
                self.last_judgment = Some(j);
            }
        }

        let finish_at = schedule.last_end_ms() + self.config.session.finish_grace_ms;
        let exhausted = self.lifecycle.is_exhausted(schedule);

        self.update_nps();

        if exhausted && now >= finish_at {
            self.clock.stop();
            self.conclude(SessionState::Finished);
        }
    }

    /// Reads the clock, applies audio resync and keeps song time monotonic.
    fn advance_time(&mut self) -> f64 {
        if let Some(position) = self.audio.as_ref().and_then(|a| a.position_ms()) {
            if let Some((drift_ms, snapped)) = self.clock.sync_to_audio(position) {
                if snapped {
                    self.events
                        .record(self.song_time_ms, EngineEvent::AudioResync { drift_ms, snapped });
                } else {
                    log::trace!("SESSION: Nudged clock by {:.2} ms drift", drift_ms);
                }
            }
        }
        self.song_time_ms = self.song_time_ms.max(self.clock.now());
        self.song_time_ms
    }

    /// Drains queued input outside a running tick. Releases during a pause
    /// still lift the lane; everything else is ignored.
    fn discard_queued_input(&mut self) {
        let queued = self.input.as_ref().map(InputQueue::drain_ordered);
        for event in queued.into_iter().flatten() {
            let sweep_time = self.song_time_ms;
            self.apply_input(event, sweep_time);
        }
    }

    /// Lifts a lane released while paused. An active hold in that lane is
    /// judged as released at the song time the pause froze.
    fn release_while_paused(&mut self, event: InputEvent) -> Option<Judgment> {
        if let Err(reason) = self.latch.accept(event.lane, event.action) {
            self.events.record(self.song_time_ms, ignored(event, reason));
            return None;
        }
        let judgment = self.judge.on_release(
            &mut self.lifecycle,
            &mut self.score,
            event.lane,
            self.song_time_ms,
            self.presenter.as_mut(),
        );
        if judgment.is_some() {
            self.last_judgment = judgment;
        }
        judgment
    }

    /// Applies a press immediately. Returns the judgment, or `None` when the
    /// press hit nothing or was ignored.
    pub fn press(&mut self, lane: Lane, timestamp_ms: f64) -> Option<Judgment> {
        let sweep_time = self.sweep_time();
        self.apply_input(InputEvent::press(lane, timestamp_ms), sweep_time)
    }

    /// Applies a release immediately.
    pub fn release(&mut self, lane: Lane, timestamp_ms: f64) -> Option<Judgment> {
        let sweep_time = self.sweep_time();
        self.apply_input(InputEvent::release(lane, timestamp_ms), sweep_time)
    }

    /// Time of the next miss sweep as far as a direct input can tell.
    fn sweep_time(&self) -> f64 {
        self.song_time_ms.max(self.clock.now())
    }

    fn apply_input(&mut self, event: InputEvent, sweep_time: f64) -> Option<Judgment> {
        if self.state == SessionState::Paused && event.action == InputAction::Release {
            return self.release_while_paused(event);
        }
        if self.state != SessionState::Running {
            self.events
                .record(self.song_time_ms, ignored(event, IgnoreReason::OutOfSession));
            return None;
        }
        if let Err(reason) = self.latch.accept(event.lane, event.action) {
            self.events.record(self.song_time_ms, ignored(event, reason));
            return None;
        }

        let time = event.timestamp_ms + self.config.session.input_offset_ms;
        let presenter = self.presenter.as_mut();
        let judgment = match event.action {
            InputAction::Press => {
                self.input_timestamps.push_back(event.timestamp_ms);
                // A target this tick's sweep would have taken.
                let racing = self
                    .lifecycle
                    .nearest_candidate(event.lane, time)
                    .map(|(id, _)| id)
                    .filter(|&id| self.lifecycle.would_overrun(id, sweep_time));
                let outcome = self.judge.on_press(
                    &mut self.lifecycle,
                    &mut self.score,
                    event.lane,
                    time,
                    presenter,
                )?;
                if racing == Some(outcome.note) {
                    self.events.record(
                        self.song_time_ms,
                        EngineEvent::ResolutionRace {
                            note: outcome.note,
                            lane: event.lane,
                        },
                    );
                }
                Some(outcome.judgment)
            }
            InputAction::Release => self.judge.on_release(
                &mut self.lifecycle,
                &mut self.score,
                event.lane,
                time,
                presenter,
            ),
        };
        if judgment.is_some() {
            self.last_judgment = judgment;
        }
        judgment
    }

    /// Updates the notes-per-second tracking.
    fn update_nps(&mut self) {
        let window_start = self.song_time_ms - NPS_WINDOW_MS;

        // Remove timestamps older than 1 second
        while let Some(&oldest) = self.input_timestamps.front() {
            if oldest < window_start {
                self.input_timestamps.pop_front();
            } else {
                break;
            }
        }

        self.current_nps = self.input_timestamps.len() as f64;
    }

    /// Feeds a block of mono samples to the diagnostic energy detector.
    pub fn feed_audio_samples(&mut self, samples: &[f32]) {
        let Some(detector) = self.energy.as_mut() else {
            return;
        };
        if let Some(candidate) = detector.process(samples) {
            self.events.record(
                self.song_time_ms,
                EngineEvent::BeatCandidate {
                    energy: candidate.energy,
                    average: candidate.average,
                },
            );
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Paused)
    }

    /// Song time of the last tick.
    pub fn song_time_ms(&self) -> f64 {
        self.song_time_ms
    }

    /// Song time over schedule duration, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.state == SessionState::Finished {
            return 100.0;
        }
        let Some(schedule) = &self.schedule else {
            return 0.0;
        };
        let duration = schedule.duration_ms();
        if duration <= 0.0 {
            return 0.0;
        }
        (self.song_time_ms / duration * 100.0).clamp(0.0, 100.0)
    }

    pub fn score_state(&self) -> &ScoreState {
        &self.score
    }

    /// Final result, available once the run stopped or finished.
    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    pub fn live_notes(&self) -> impl Iterator<Item = &LiveNote> {
        self.lifecycle.live_notes()
    }

    pub fn active_hold(&self, lane: Lane) -> Option<&LiveNote> {
        self.lifecycle.active_hold(lane)
    }

    pub fn timing_info(&self) -> TimingInfo {
        TimingInfo {
            current_time_ms: self.song_time_ms,
            ..self.clock.timing_info()
        }
    }

    pub fn beats_fired(&self) -> u64 {
        self.beats_fired
    }

    pub fn nps(&self) -> f64 {
        self.current_nps
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn ignored(event: InputEvent, reason: IgnoreReason) -> EngineEvent {
    EngineEvent::InputIgnored {
        lane: event.lane,
        action: event.action,
        timestamp_ms: event.timestamp_ms,
        reason,
    }
}
