//! Judgment of presses and releases, and application of lifecycle events.
//!
//! The `JudgmentEngine` is the only code that mutates a `ScoreState`. It picks
//! targets and judgments, then moves notes through `NoteLifecycle`'s
//! transition operations.

use super::notes::{LifecycleEvent, NoteLifecycle};
use crate::models::chart::Lane;
use crate::models::engine::{HitWindow, HoldWindow, NoteId, NoteType, ScoreTable};
use crate::models::settings::EngineConfig;
use crate::models::stats::{Judgment, ScoreState};
use crate::shared::presenter::Presenter;

/// What a press resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressOutcome {
    pub note: NoteId,
    pub judgment: Judgment,
    pub hit_time_ms: f64,
    /// Signed time offset of the press, negative when early.
    pub offset_ms: f64,
    /// True when the press started a hold.
    pub began_hold: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct JudgmentEngine {
    hit_window: HitWindow,
    hold_window: HoldWindow,
    scoring: ScoreTable,
}

impl JudgmentEngine {
    pub fn new(hit_window: HitWindow, hold_window: HoldWindow, scoring: ScoreTable) -> Self {
        Self {
            hit_window,
            hold_window,
            scoring,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.hit_window, config.hold_window, config.scoring)
    }

    /// Judges a press on `lane` at `time_ms`.
    ///
    /// The target is the closest unresolved note in the lane. Beyond the
    /// outer window nothing happens. A tap is resolved; a hold begins, unless
    /// the press itself was a miss, which resolves it as missed.
    pub fn on_press(
        &self,
        lifecycle: &mut NoteLifecycle,
        score: &mut ScoreState,
        lane: Lane,
        time_ms: f64,
        presenter: &mut dyn Presenter,
    ) -> Option<PressOutcome> {
        let (id, distance) = lifecycle.nearest_candidate(lane, time_ms)?;
        let judgment = self.hit_window.judge(distance)?;
        let note = lifecycle.get(id)?;
        let hit_time_ms = note.hit_time_ms;
        let offset_ms = time_ms - hit_time_ms;
        let is_hold = note.note_type == NoteType::Hold;

        score.record_judgment(judgment, self.scoring.judgment.points(judgment));

        let began_hold = is_hold && !judgment.is_miss() && lifecycle.begin_hold(id, time_ms);
        if !began_hold {
            lifecycle.resolve_tap(id, judgment, presenter);
        }

        log::debug!(
            "SESSION: {} on {} lane ({:+.1} ms) -> {}",
            if began_hold { "Hold start" } else { "Tap" },
            lane,
            offset_ms,
            judgment
        );

        Some(PressOutcome {
            note: id,
            judgment,
            hit_time_ms,
            offset_ms,
            began_hold,
        })
    }

    /// Judges a release on `lane` at `time_ms`.
    ///
    /// Only an active hold reacts. Progress owed up to the release is
    /// credited, then the hold is judged by the fraction held.
    pub fn on_release(
        &self,
        lifecycle: &mut NoteLifecycle,
        score: &mut ScoreState,
        lane: Lane,
        time_ms: f64,
        presenter: &mut dyn Presenter,
    ) -> Option<Judgment> {
        let (id, points, ratio) = lifecycle.settle_hold(lane, time_ms)?;
        if points > 0 {
            score.add_hold_progress(points);
        }
        let judgment = self.hold_window.judge(ratio);
        self.complete_hold(lifecycle, score, lane, judgment, presenter);
        log::debug!(
            "SESSION: Hold {} released at {:.0}% -> {}",
            id,
            ratio * 100.0,
            judgment
        );
        Some(judgment)
    }

    /// Applies lifecycle events in order.
    pub fn apply_events(
        &self,
        events: &[LifecycleEvent],
        lifecycle: &mut NoteLifecycle,
        score: &mut ScoreState,
        presenter: &mut dyn Presenter,
    ) -> Option<Judgment> {
        let mut last = None;
        for event in events {
            match *event {
                LifecycleEvent::Missed { note, lane } => {
                    score.record_judgment(Judgment::Miss, self.scoring.judgment.miss);
                    log::debug!("SESSION: Note {} on {} lane overran -> MISS", note, lane);
                    last = Some(Judgment::Miss);
                }
                LifecycleEvent::HoldProgress { points, .. } => score.add_hold_progress(points),
                LifecycleEvent::HoldElapsed { lane, .. } => {
                    self.complete_hold(lifecycle, score, lane, Judgment::Perfect, presenter);
                    last = Some(Judgment::Perfect);
                }
            }
        }
        last
    }

    fn complete_hold(
        &self,
        lifecycle: &mut NoteLifecycle,
        score: &mut ScoreState,
        lane: Lane,
        judgment: Judgment,
        presenter: &mut dyn Presenter,
    ) {
        score.record_hold_completion(judgment, self.scoring.hold_bonus.points(judgment));
        lifecycle.finish_hold(lane, judgment, presenter);
    }
}
