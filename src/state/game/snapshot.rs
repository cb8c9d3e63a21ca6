//! Snapshot creation for GameSession.

use super::GameSession;
use crate::models::engine::LiveNote;
use crate::shared::snapshot::GameplaySnapshot;

impl GameSession {
    /// Creates a snapshot of the current session state.
    pub fn snapshot(&self) -> GameplaySnapshot {
        let notes: Vec<LiveNote> = self.lifecycle.live_notes().cloned().collect();
        let remaining_notes = self
            .schedule
            .as_ref()
            .map_or(0, |s| self.lifecycle.remaining(s));

        GameplaySnapshot {
            state: self.state,
            song_time_ms: self.song_time_ms,
            progress_percent: self.progress_percent(),
            notes,
            active_holds: self.lifecycle.active_holds(),
            keys_held: self.latch.pressed(),
            score: self.score.clone(),
            accuracy: self.score.accuracy(),
            remaining_notes,
            last_judgment: self.last_judgment,
            nps: self.current_nps,
            beats_fired: self.beats_fired,
            timing: self.timing_info(),
        }
    }
}
