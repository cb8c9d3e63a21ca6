//! Adaptive difficulty transforms.
//!
//! Both transforms take a schedule and return a new one; neither touches a
//! running session.

use crate::chart::timing::Schedule;
use crate::models::chart::{Lane, LaneSet};
use crate::models::engine::{ChartNote, NoteType};
use rand::Rng;
use rand::seq::index;

/// Upper bound on the share of notes `increase` may promote in one call.
pub const MAX_PROMOTION_SHARE: f64 = 0.30;
/// Intensity at or above which a note counts as high-intensity.
pub const HIGH_INTENSITY: f32 = 0.7;
/// One in this many high-intensity notes is removed by `decrease`.
pub const REMOVAL_STRIDE: usize = 4;

/// Promotes a random subset of single-lane taps to dual-lane notes.
///
/// `amount` in `[0, 1]` is the share of eligible notes to promote, capped at
/// [`MAX_PROMOTION_SHARE`] of the whole schedule. A note is eligible only if
/// the other lane has nothing within the minimum separation of it, so the
/// result always passes the same spacing rules as the input.
pub fn increase<R: Rng + ?Sized>(schedule: &Schedule, amount: f64, rng: &mut R) -> Schedule {
    let eligible: Vec<usize> = schedule
        .notes
        .iter()
        .enumerate()
        .filter(|(_, note)| is_promotable(schedule, note))
        .map(|(i, _)| i)
        .collect();

    let wanted = (amount.clamp(0.0, 1.0) * eligible.len() as f64).round() as usize;
    let cap = (schedule.notes.len() as f64 * MAX_PROMOTION_SHARE).floor() as usize;
    let count = wanted.min(cap).min(eligible.len());

    let mut out = schedule.clone();
    for pick in index::sample(rng, eligible.len(), count) {
        out.notes[eligible[pick]].lanes = LaneSet::Both;
    }

    log::info!(
        "CHART: Difficulty up, promoted {} of {} eligible notes to both lanes",
        count,
        eligible.len()
    );
    out
}

fn is_promotable(schedule: &Schedule, note: &ChartNote) -> bool {
    let Some(lane) = single_lane(note.lanes) else {
        return false;
    };
    if note.note_type != NoteType::Normal {
        return false;
    }
    let other = lane.other();
    let margin = schedule.min_separation_ms;
    !schedule.notes.iter().any(|n| {
        n.lanes.contains(other)
            && note.hit_time_ms > n.hit_time_ms - margin
            && note.hit_time_ms < n.end_time_ms() + margin
    })
}

fn single_lane(lanes: LaneSet) -> Option<Lane> {
    match lanes {
        LaneSet::Top => Some(Lane::Top),
        LaneSet::Bottom => Some(Lane::Bottom),
        LaneSet::Both => None,
    }
}

/// Thins high-intensity passages and collapses dual-lane notes.
///
/// Every [`REMOVAL_STRIDE`]-th high-intensity note is removed. Remaining
/// dual-lane notes keep one lane, alternating top and bottom.
pub fn decrease(schedule: &Schedule) -> Schedule {
    let mut out = schedule.clone();
    let mut high_seen = 0usize;
    let mut removed = 0usize;
    let mut next_lane = Lane::Top;

    out.notes.retain(|note| {
        if note.intensity < HIGH_INTENSITY {
            return true;
        }
        high_seen += 1;
        let keep = high_seen % REMOVAL_STRIDE != 0;
        if !keep {
            removed += 1;
        }
        keep
    });

    let mut collapsed = 0usize;
    for note in out.notes.iter_mut().filter(|n| n.lanes.is_dual()) {
        note.lanes = LaneSet::single(next_lane);
        next_lane = next_lane.other();
        collapsed += 1;
    }

    log::info!(
        "CHART: Difficulty down, removed {} high-intensity notes, collapsed {} dual notes",
        removed,
        collapsed
    );
    out
}
