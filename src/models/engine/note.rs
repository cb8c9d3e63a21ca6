//! Scheduled and live note structures.

use crate::models::chart::{Lane, LaneSet};
use crate::shared::presenter::VisualHandle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type of note in a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteType {
    /// Simple tap note - press once.
    Normal,
    /// Hold note - press and keep pressed for the hold duration.
    Hold,
}

impl NoteType {
    /// Returns true if this is a hold note.
    pub fn is_hold(self) -> bool {
        self == NoteType::Hold
    }
}

/// A scheduling record produced by the timing model.
///
/// Invariant: `spawn_time_ms == hit_time_ms - travel_time_ms` and
/// `spawn_time_ms >= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartNote {
    /// When the note appears at the travel start (ms).
    pub spawn_time_ms: f64,
    /// When the note reaches the hit zone (ms).
    pub hit_time_ms: f64,
    pub lanes: LaneSet,
    pub note_type: NoteType,
    /// Zero for normal notes.
    pub hold_duration_ms: f64,
    /// Section or measure intensity, read only by difficulty transforms.
    pub intensity: f32,
}

impl ChartNote {
    /// Returns the end time of this note.
    /// For holds: hit time + duration. For taps: same as hit time.
    pub fn end_time_ms(&self) -> f64 {
        self.hit_time_ms + self.hold_duration_ms
    }

    pub fn is_hold(&self) -> bool {
        self.note_type.is_hold()
    }

    /// Returns true if this note occupies `lane` at `time_ms` (hit time through hold end).
    pub fn covers(&self, lane: Lane, time_ms: f64) -> bool {
        self.lanes.contains(lane) && time_ms >= self.hit_time_ms && time_ms <= self.end_time_ms()
    }
}

/// Stable identifier of a live note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NoteId(pub u64);

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime state of a live note.
///
/// Being hittable is a predicate over the position, not a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteState {
    Spawned,
    Traveling,
    Hit,
    Holding,
    HoldResolved,
    Missed,
    Removed,
}

impl NoteState {
    /// Returns true once the note can no longer be judged.
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            NoteState::Hit | NoteState::HoldResolved | NoteState::Missed | NoteState::Removed
        )
    }
}

/// A note on the playfield, one per lane of a spawned chart note.
#[derive(Debug, Clone, Serialize)]
pub struct LiveNote {
    pub id: NoteId,
    pub lane: Lane,
    pub note_type: NoteType,
    pub hit_time_ms: f64,
    pub hold_duration_ms: f64,
    pub state: NoteState,
    /// Engine-computed position in playfield units.
    pub screen_position: f64,
    /// Song time at which the hold began.
    pub hold_start_ms: Option<f64>,
    /// Progressive increments already awarded for this hold.
    pub hold_increments: u32,
    /// Progressive score already awarded for this hold.
    pub hold_accrued_score: u32,
    /// Presenter handle, absent when the presenter failed to create a visual.
    #[serde(skip)]
    pub visual: Option<VisualHandle>,
}

impl LiveNote {
    pub fn new(id: NoteId, lane: Lane, chart_note: &ChartNote, screen_position: f64) -> Self {
        Self {
            id,
            lane,
            note_type: chart_note.note_type,
            hit_time_ms: chart_note.hit_time_ms,
            hold_duration_ms: chart_note.hold_duration_ms,
            state: NoteState::Spawned,
            screen_position,
            hold_start_ms: None,
            hold_increments: 0,
            hold_accrued_score: 0,
            visual: None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.note_type.is_hold()
    }

    pub fn end_time_ms(&self) -> f64 {
        self.hit_time_ms + self.hold_duration_ms
    }

    /// Time the hold has been kept down at `now_ms`, zero if not holding.
    pub fn held_ms(&self, now_ms: f64) -> f64 {
        self.hold_start_ms
            .map_or(0.0, |start| (now_ms - start).max(0.0))
    }

    /// Completion ratio of the hold at `now_ms`.
    pub fn hold_ratio(&self, now_ms: f64) -> f64 {
        if self.hold_duration_ms <= 0.0 {
            return 1.0;
        }
        self.held_ms(now_ms) / self.hold_duration_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold_note() -> ChartNote {
        ChartNote {
            spawn_time_ms: 0.0,
            hit_time_ms: 2000.0,
            lanes: LaneSet::Top,
            note_type: NoteType::Hold,
            hold_duration_ms: 1000.0,
            intensity: 0.5,
        }
    }

    #[test]
    fn test_chart_note_covers_hold_span() {
        let note = hold_note();
        assert!(note.covers(Lane::Top, 2500.0));
        assert!(!note.covers(Lane::Bottom, 2500.0));
        assert!(!note.covers(Lane::Top, 3001.0));
        assert_eq!(note.end_time_ms(), 3000.0);
    }

    #[test]
    fn test_hold_ratio_tracks_start_time() {
        let mut live = LiveNote::new(NoteId(1), Lane::Top, &hold_note(), 0.0);
        assert_eq!(live.hold_ratio(2500.0), 0.0);
        live.hold_start_ms = Some(2000.0);
        assert_eq!(live.hold_ratio(2500.0), 0.5);
        assert_eq!(live.held_ms(1900.0), 0.0);
    }

    #[test]
    fn test_resolved_states() {
        assert!(!NoteState::Holding.is_resolved());
        assert!(!NoteState::Traveling.is_resolved());
        assert!(NoteState::Missed.is_resolved());
        assert!(NoteState::HoldResolved.is_resolved());
    }
}
