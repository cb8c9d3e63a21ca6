//! Live note ownership and per-tick advancement.
//!
//! `NoteLifecycle` is the only owner of live notes and of the per-lane active
//! hold table. It moves notes, detects overruns and hold progress, and reports
//! what happened as events; applying those events to the score is left to the
//! judgment engine, which calls back into the transition operations here.

use crate::chart::timing::Schedule;
use crate::logic::event_log::{EngineEvent, EventLog};
use crate::models::chart::{LANE_COUNT, Lane};
use crate::models::engine::{LiveNote, NoteId, NoteState, PlayfieldConfig, ScoreTable};
use crate::models::stats::Judgment;
use crate::shared::presenter::Presenter;
use std::collections::BTreeMap;

/// Something the lifecycle observed that affects the score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LifecycleEvent {
    /// An untouched note passed the overrun margin; already removed.
    Missed { note: NoteId, lane: Lane },
    /// New progressive hold increments were crossed.
    HoldProgress { note: NoteId, lane: Lane, points: u32 },
    /// A hold was kept down for its full duration and awaits completion.
    HoldElapsed { note: NoteId, lane: Lane },
}

/// Arena of live notes plus the active hold table.
pub struct NoteLifecycle {
    playfield: PlayfieldConfig,
    scoring: ScoreTable,
    notes: BTreeMap<NoteId, LiveNote>,
    active_holds: [Option<NoteId>; LANE_COUNT],
    next_id: u64,
    /// Index of the next schedule entry to spawn.
    cursor: usize,
}

impl NoteLifecycle {
    pub fn new(playfield: PlayfieldConfig, scoring: ScoreTable) -> Self {
        Self {
            playfield,
            scoring,
            notes: BTreeMap::new(),
            active_holds: [None; LANE_COUNT],
            next_id: 0,
            cursor: 0,
        }
    }

    /// Forgets everything, including the spawn cursor.
    pub fn reset(&mut self, presenter: &mut dyn Presenter) {
        self.clear(presenter);
        self.cursor = 0;
        self.next_id = 0;
    }

    /// Removes every live note and releases every active hold without
    /// judging anything.
    pub fn clear(&mut self, presenter: &mut dyn Presenter) {
        for note in self.notes.values_mut() {
            note.state = NoteState::Removed;
            if let Some(handle) = note.visual {
                presenter.on_remove(handle);
            }
        }
        self.notes.clear();
        self.active_holds = [None; LANE_COUNT];
    }

    /// Spawns every scheduled note whose spawn time has come, one live note
    /// per lane.
    pub fn spawn_due(
        &mut self,
        schedule: &Schedule,
        now_ms: f64,
        presenter: &mut dyn Presenter,
        log: &mut EventLog,
    ) -> usize {
        let mut spawned = 0;
        while let Some(chart_note) = schedule.notes.get(self.cursor) {
            if chart_note.spawn_time_ms > now_ms {
                break;
            }
            for &lane in chart_note.lanes.lanes() {
                self.next_id += 1;
                let id = NoteId(self.next_id);
                let position = self.playfield.position_at(chart_note.hit_time_ms, now_ms);
                let mut note = LiveNote::new(id, lane, chart_note, position);

                match presenter.on_spawn(&note) {
                    Ok(handle) => note.visual = Some(handle),
                    Err(e) => log.record(
                        now_ms,
                        EngineEvent::PresenterFailure {
                            note: id,
                            message: e.0,
                        },
                    ),
                }
                self.notes.insert(id, note);
                spawned += 1;
            }
            self.cursor += 1;
        }
        spawned
    }

    /// Recomputes positions from song time. Spawned notes start traveling.
    pub fn advance(&mut self, now_ms: f64, presenter: &mut dyn Presenter) {
        for note in self.notes.values_mut() {
            note.screen_position = self.playfield.position_at(note.hit_time_ms, now_ms);
            if note.state == NoteState::Spawned {
                note.state = NoteState::Traveling;
            }
            if let Some(handle) = note.visual {
                presenter.on_position_update(handle, note.screen_position);
            }
        }
    }

    /// Awards progressive increments for every active hold and reports holds
    /// that have run their full duration.
    pub fn process_holds(
        &mut self,
        now_ms: f64,
        presenter: &mut dyn Presenter,
    ) -> Vec<LifecycleEvent> {
        let mut events = Vec::new();
        for lane in Lane::ALL {
            let Some(id) = self.active_holds[lane.index()] else {
                continue;
            };
            let points = self.accrue_hold(id, now_ms);
            let Some(note) = self.notes.get(&id) else {
                continue;
            };
            if points > 0 {
                events.push(LifecycleEvent::HoldProgress {
                    note: id,
                    lane,
                    points,
                });
            }
            if let Some(handle) = note.visual {
                presenter.on_hold_progress(handle, note.hold_ratio(now_ms).min(1.0));
            }
            if note.held_ms(now_ms) >= note.hold_duration_ms {
                events.push(LifecycleEvent::HoldElapsed { note: id, lane });
            }
        }
        events
    }

    /// Credits the increments crossed up to `now_ms` and returns their points.
    /// Increments already credited are never counted again.
    fn accrue_hold(&mut self, id: NoteId, now_ms: f64) -> u32 {
        let Some(note) = self.notes.get_mut(&id) else {
            return 0;
        };
        let tick = self.scoring.hold_tick_ms;
        let cap = (note.hold_duration_ms / tick).floor() as u32;
        let crossed = ((note.held_ms(now_ms) / tick).floor() as u32).min(cap);
        let fresh = crossed.saturating_sub(note.hold_increments);
        if fresh == 0 {
            return 0;
        }
        let points = fresh * self.scoring.hold_tick_points;
        note.hold_increments = crossed;
        note.hold_accrued_score += points;
        points
    }

    /// Marks untouched notes past the overrun margin as missed and removes
    /// them. Each note is swept at most once.
    pub fn sweep_misses(
        &mut self,
        now_ms: f64,
        presenter: &mut dyn Presenter,
    ) -> Vec<LifecycleEvent> {
        let overrun: Vec<NoteId> = self
            .notes
            .values()
            .filter(|n| matches!(n.state, NoteState::Spawned | NoteState::Traveling))
            .filter(|n| self.is_overrun_at(n, now_ms))
            .map(|n| n.id)
            .collect();

        overrun
            .into_iter()
            .filter_map(|id| {
                let lane = self.notes.get(&id)?.lane;
                self.resolve(id, NoteState::Missed, Judgment::Miss, presenter);
                Some(LifecycleEvent::Missed { note: id, lane })
            })
            .collect()
    }

    fn is_overrun_at(&self, note: &LiveNote, now_ms: f64) -> bool {
        self.playfield
            .is_overrun(self.playfield.position_at(note.hit_time_ms, now_ms))
    }

    /// Returns true if the note would be taken by a miss sweep at `now_ms`.
    pub fn would_overrun(&self, id: NoteId, now_ms: f64) -> bool {
        self.notes
            .get(&id)
            .is_some_and(|n| self.is_overrun_at(n, now_ms))
    }

    /// The unresolved, non-holding note in `lane` closest to the hit zone at
    /// `time_ms`, with its distance.
    pub fn nearest_candidate(&self, lane: Lane, time_ms: f64) -> Option<(NoteId, f64)> {
        self.notes
            .values()
            .filter(|n| n.lane == lane)
            .filter(|n| matches!(n.state, NoteState::Spawned | NoteState::Traveling))
            .map(|n| (n.id, self.playfield.distance_at(n.hit_time_ms, time_ms)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Resolves a tap (or a hold whose press was a miss) and removes it.
    pub fn resolve_tap(&mut self, id: NoteId, judgment: Judgment, presenter: &mut dyn Presenter) {
        let state = if judgment.is_miss() {
            NoteState::Missed
        } else {
            NoteState::Hit
        };
        self.resolve(id, state, judgment, presenter);
    }

    /// Puts a hold note into the holding state from `time_ms`.
    pub fn begin_hold(&mut self, id: NoteId, time_ms: f64) -> bool {
        let Some(note) = self.notes.get_mut(&id) else {
            return false;
        };
        if self.active_holds[note.lane.index()].is_some() {
            return false;
        }
        note.state = NoteState::Holding;
        note.hold_start_ms = Some(time_ms);
        self.active_holds[note.lane.index()] = Some(id);
        true
    }

    /// Credits any increments still owed up to `time_ms` and returns them
    /// with the hold ratio, leaving the hold active.
    pub fn settle_hold(&mut self, lane: Lane, time_ms: f64) -> Option<(NoteId, u32, f64)> {
        let id = self.active_holds[lane.index()]?;
        let points = self.accrue_hold(id, time_ms);
        let ratio = self.notes.get(&id)?.hold_ratio(time_ms);
        Some((id, points, ratio))
    }

    /// Ends the active hold in `lane` with its final judgment and removes it.
    pub fn finish_hold(&mut self, lane: Lane, judgment: Judgment, presenter: &mut dyn Presenter) {
        if let Some(id) = self.active_holds[lane.index()].take() {
            self.resolve(id, NoteState::HoldResolved, judgment, presenter);
        }
    }

    fn resolve(
        &mut self,
        id: NoteId,
        state: NoteState,
        judgment: Judgment,
        presenter: &mut dyn Presenter,
    ) {
        if let Some(mut note) = self.notes.remove(&id) {
            note.state = state;
            if let Some(handle) = note.visual {
                presenter.on_resolve(handle, judgment);
                presenter.on_remove(handle);
            }
            log::trace!("SESSION: Note {} on {} lane -> {:?}", id, note.lane, state);
        }
    }

    pub fn get(&self, id: NoteId) -> Option<&LiveNote> {
        self.notes.get(&id)
    }

    pub fn live_notes(&self) -> impl Iterator<Item = &LiveNote> {
        self.notes.values()
    }

    pub fn live_count(&self) -> usize {
        self.notes.len()
    }

    pub fn active_hold(&self, lane: Lane) -> Option<&LiveNote> {
        self.active_holds[lane.index()].and_then(|id| self.notes.get(&id))
    }

    pub fn active_holds(&self) -> [Option<NoteId>; LANE_COUNT] {
        self.active_holds
    }

    /// Schedule entries not spawned yet.
    pub fn pending(&self, schedule: &Schedule) -> usize {
        schedule.notes.len().saturating_sub(self.cursor)
    }

    /// Per-lane notes not yet judged: live ones plus everything unspawned.
    pub fn remaining(&self, schedule: &Schedule) -> usize {
        let unspawned: usize = schedule
            .notes
            .iter()
            .skip(self.cursor)
            .map(|n| n.lanes.lanes().len())
            .sum();
        unspawned + self.notes.len()
    }

    /// Returns true once everything has spawned and been resolved.
    pub fn is_exhausted(&self, schedule: &Schedule) -> bool {
        self.pending(schedule) == 0 && self.notes.is_empty()
    }
}
