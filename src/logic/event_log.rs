//! Record of non-fatal engine conditions.
//!
//! Nothing recorded here changes engine output beyond the documented fallback;
//! the log exists so callers can inspect what was dropped or ignored.

use crate::input::events::InputAction;
use crate::models::chart::{Lane, LaneSet};
use crate::models::engine::NoteId;

/// Why an input event was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The session was not running (idle, paused, stopped or finished).
    OutOfSession,
    /// Press on a lane that is already down.
    AlreadyPressed,
    /// Release on a lane that is already up.
    NotPressed,
}

/// A non-fatal condition observed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A scheduled note would have spawned before time zero and was dropped.
    NoteDropped {
        hit_time_ms: f64,
        spawn_time_ms: f64,
        lanes: LaneSet,
    },
    InputIgnored {
        lane: Lane,
        action: InputAction,
        timestamp_ms: f64,
        reason: IgnoreReason,
    },
    /// A press resolved a note that this tick's miss sweep would have taken.
    ResolutionRace { note: NoteId, lane: Lane },
    PresenterFailure { note: NoteId, message: String },
    /// Low-band energy spike; diagnostic only.
    BeatCandidate { energy: f32, average: f32 },
    AudioResync { drift_ms: f64, snapped: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggedEvent {
    /// Song time at which the event was recorded.
    pub time_ms: f64,
    pub event: EngineEvent,
}

/// Append-only event log owned by a session.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and mirrors it to the text log.
    pub fn record(&mut self, time_ms: f64, event: EngineEvent) {
        match &event {
            EngineEvent::NoteDropped { hit_time_ms, spawn_time_ms, lanes } => log::warn!(
                "CHART: Dropped {:?} note due at {:.1} ms (spawn {:.1} ms is before start)",
                lanes,
                hit_time_ms,
                spawn_time_ms
            ),
            EngineEvent::PresenterFailure { note, message } => {
                log::warn!("SESSION: Presenter failed for note {}: {}", note, message)
            }
            EngineEvent::BeatCandidate { energy, average } => log::trace!(
                "CLOCK: Energy beat candidate at {:.1} ms ({:.4} vs avg {:.4})",
                time_ms,
                energy,
                average
            ),
            other => log::debug!("SESSION: {:?} at {:.1} ms", other, time_ms),
        }
        self.entries.push(LoggedEvent { time_ms, event });
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&EngineEvent) -> bool) -> usize {
        self.entries.iter().filter(|e| predicate(&e.event)).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_filters_by_kind() {
        let mut log = EventLog::new();
        log.record(
            0.0,
            EngineEvent::NoteDropped {
                hit_time_ms: 500.0,
                spawn_time_ms: -1500.0,
                lanes: LaneSet::Top,
            },
        );
        log.record(
            10.0,
            EngineEvent::InputIgnored {
                lane: Lane::Top,
                action: InputAction::Press,
                timestamp_ms: 10.0,
                reason: IgnoreReason::OutOfSession,
            },
        );
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.count(|e| matches!(e, EngineEvent::NoteDropped { .. })),
            1
        );
        log.clear();
        assert!(log.is_empty());
    }
}
