//! Immutable captures of session state.
//!
//! Snapshots are taken by the session on request and handed to whatever shows
//! or records them. They never point back into the session.

use crate::error::SessionState;
use crate::logic::clock::TimingInfo;
use crate::models::chart::LANE_COUNT;
use crate::models::engine::{LiveNote, NoteId};
use crate::models::stats::{Grade, Judgment, JudgmentCounts, ScoreState};
use serde::Serialize;

/// Snapshot of gameplay state.
#[derive(Clone, Debug, Serialize)]
pub struct GameplaySnapshot {
    pub state: SessionState,
    /// Current song time in milliseconds.
    pub song_time_ms: f64,
    pub progress_percent: f64,

    /// Live notes in id order.
    pub notes: Vec<LiveNote>,
    /// Per-lane held hold note.
    pub active_holds: [Option<NoteId>; LANE_COUNT],
    /// Per-lane key state.
    pub keys_held: [bool; LANE_COUNT],

    pub score: ScoreState,
    /// `None` until something is judged.
    pub accuracy: Option<f64>,
    /// Notes not yet judged, counting each lane of a dual note.
    pub remaining_notes: usize,

    /// Last judgment (for flash display).
    pub last_judgment: Option<Judgment>,

    /// Presses in the last second.
    pub nps: f64,
    pub beats_fired: u64,
    pub timing: TimingInfo,
}

/// Final outcome of a session, produced once when it stops or finishes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionResult {
    pub state: SessionState,
    pub total_score: u64,
    pub max_combo: u32,
    pub counts: JudgmentCounts,
    pub accuracy: Option<f64>,
    pub grade: Grade,
    pub song_time_ms: f64,
    /// Notes dropped at scheduling for spawning before zero.
    pub dropped_notes: usize,
}
