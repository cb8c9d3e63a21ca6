//! Session clock: elapsed song time, pause accounting and beat events.
//!
//! Song time is host time since `start` minus every paused interval, plus a
//! correction term fed by audio resynchronization. The host time comes from a
//! `TimeSource` so tests and offline runs can drive it by hand.

use crate::models::settings::ClockConfig;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic host time in milliseconds.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Wall-clock time since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    origin: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven time. Clones share the same underlying value.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Rc<Cell<f64>>,
}

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// A beat fired by the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatEvent {
    /// Beat number counted from the first beat of the chart.
    pub index: u64,
    /// Scheduled time of the beat.
    pub beat_time_ms: f64,
    /// Song time at which it fired.
    pub fired_at_ms: f64,
}

/// Read-only timing snapshot.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct TimingInfo {
    pub current_time_ms: f64,
    pub bpm: f64,
    pub beat_interval_ms: f64,
    pub next_beat_time_ms: f64,
}

type BeatCallback = Box<dyn FnMut(&BeatEvent)>;

pub struct Clock {
    source: Box<dyn TimeSource>,
    config: ClockConfig,
    state: ClockState,

    /// Host time at `start`.
    started_at: f64,
    /// Host time at the current pause.
    paused_at: f64,
    /// Sum of completed pauses.
    paused_total: f64,
    /// Accumulated audio drift correction.
    correction_ms: f64,
    /// Song time frozen at `stop`.
    stopped_at: f64,

    bpm: f64,
    beat_interval_ms: f64,
    first_beat_ms: f64,
    next_beat_ms: f64,
    beat_index: u64,
    listeners: Vec<BeatCallback>,
}

impl Clock {
    pub fn new(source: Box<dyn TimeSource>, config: ClockConfig) -> Self {
        Self {
            source,
            config,
            state: ClockState::Idle,
            started_at: 0.0,
            paused_at: 0.0,
            paused_total: 0.0,
            correction_ms: 0.0,
            stopped_at: 0.0,
            bpm: 120.0,
            beat_interval_ms: 500.0,
            first_beat_ms: 0.0,
            next_beat_ms: 0.0,
            beat_index: 0,
            listeners: Vec::new(),
        }
    }

    /// Sets the tempo and the song time of the first beat.
    ///
    /// A negative first beat is moved forward by whole beats to the first
    /// beat at or after zero.
    pub fn set_tempo(&mut self, bpm: f64, first_beat_ms: f64) {
        self.bpm = bpm;
        self.beat_interval_ms = 60_000.0 / bpm;
        let mut first = first_beat_ms;
        if first < 0.0 {
            let skipped = (-first / self.beat_interval_ms).ceil();
            first += skipped * self.beat_interval_ms;
        }
        self.first_beat_ms = first;
        self.next_beat_ms = first;
        self.beat_index = 0;
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Starts (or restarts) counting from zero.
    pub fn start(&mut self) {
        self.started_at = self.source.now_ms();
        self.paused_total = 0.0;
        self.correction_ms = 0.0;
        self.stopped_at = 0.0;
        self.next_beat_ms = self.first_beat_ms;
        self.beat_index = 0;
        self.state = ClockState::Running;
    }

    /// Freezes song time. Returns false if the clock was not running.
    pub fn pause(&mut self) -> bool {
        if self.state != ClockState::Running {
            return false;
        }
        self.paused_at = self.source.now_ms();
        self.state = ClockState::Paused;
        true
    }

    /// Resumes after a pause, excluding the paused interval from song time.
    pub fn resume(&mut self) -> bool {
        if self.state != ClockState::Paused {
            return false;
        }
        self.paused_total += self.source.now_ms() - self.paused_at;
        self.state = ClockState::Running;
        true
    }

    /// Freezes song time for good. Calling it again changes nothing.
    pub fn stop(&mut self) {
        if matches!(self.state, ClockState::Running | ClockState::Paused) {
            self.stopped_at = self.now();
            self.state = ClockState::Stopped;
        }
    }

    /// Elapsed song time in milliseconds.
    pub fn now(&self) -> f64 {
        match self.state {
            ClockState::Idle => 0.0,
            ClockState::Running => {
                self.source.now_ms() - self.started_at - self.paused_total + self.correction_ms
            }
            ClockState::Paused => {
                self.paused_at - self.started_at - self.paused_total + self.correction_ms
            }
            ClockState::Stopped => self.stopped_at,
        }
    }

    /// Registers a callback invoked for every beat fired by `poll_beats`.
    pub fn on_beat(&mut self, callback: impl FnMut(&BeatEvent) + 'static) {
        self.listeners.push(Box::new(callback));
    }

    /// Fires the next beat if due.
    ///
    /// A beat fires once the time since the previous scheduled beat reaches
    /// `beat_interval * beat_tolerance`. The schedule advances by whole
    /// intervals, so early firing never accumulates into drift. Beats skipped
    /// by a long gap (audio snap) are collapsed into one event.
    pub fn poll_beats(&mut self) -> Option<BeatEvent> {
        if self.state != ClockState::Running {
            return None;
        }
        let now = self.now();
        let previous_beat = self.next_beat_ms - self.beat_interval_ms;
        if now - previous_beat < self.beat_interval_ms * self.config.beat_tolerance {
            return None;
        }

        let behind = ((now - self.next_beat_ms) / self.beat_interval_ms).floor();
        if behind >= 1.0 {
            self.next_beat_ms += behind * self.beat_interval_ms;
            self.beat_index += behind as u64;
        }

        let event = BeatEvent {
            index: self.beat_index,
            beat_time_ms: self.next_beat_ms,
            fired_at_ms: now,
        };
        self.beat_index += 1;
        self.next_beat_ms += self.beat_interval_ms;

        for listener in &mut self.listeners {
            listener(&event);
        }
        Some(event)
    }

    /// Pulls song time toward the audio position.
    ///
    /// Large drift snaps, small drift is nudged by a fraction, tiny drift is
    /// left alone. Returns the drift and whether it snapped when a correction
    /// was applied.
    pub fn sync_to_audio(&mut self, audio_ms: f64) -> Option<(f64, bool)> {
        if self.state != ClockState::Running {
            return None;
        }
        let drift = audio_ms - self.now();

        if drift.abs() > self.config.drift_snap_ms {
            self.correction_ms += drift;
            Some((drift, true))
        } else if drift.abs() > self.config.drift_nudge_ms {
            self.correction_ms += drift * self.config.drift_nudge_factor;
            Some((drift, false))
        } else {
            None
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn beat_interval_ms(&self) -> f64 {
        self.beat_interval_ms
    }

    pub fn timing_info(&self) -> TimingInfo {
        TimingInfo {
            current_time_ms: self.now(),
            bpm: self.bpm,
            beat_interval_ms: self.beat_interval_ms,
            next_beat_time_ms: self.next_beat_ms,
        }
    }
}
