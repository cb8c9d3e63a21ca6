//! Scripted input that plays a schedule.
//!
//! Every note gets a press near its hit time and a matching release: shortly
//! after the press for taps, just past the end for holds. Releases never cross
//! the next press in the same lane, so the script survives de-bouncing intact.

use crate::chart::timing::Schedule;
use crate::input::events::InputEvent;
use crate::models::chart::Lane;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Time a tap key stays down.
const TAP_HOLD_MS: f64 = 40.0;
/// Extra time a hold key stays down after the hold end.
const HOLD_OVERSHOOT_MS: f64 = 20.0;

pub struct AutoPlayer {
    /// Presses land uniformly within +/- this many ms of the hit time.
    timing_error_ms: f64,
    rng: StdRng,
}

impl AutoPlayer {
    pub fn new(timing_error_ms: f64, seed: u64) -> Self {
        Self {
            timing_error_ms: timing_error_ms.abs(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A player that presses exactly on time.
    pub fn perfect() -> Self {
        Self::new(0.0, 0)
    }

    fn jitter(&mut self) -> f64 {
        if self.timing_error_ms == 0.0 {
            return 0.0;
        }
        self.rng
            .random_range(-self.timing_error_ms..=self.timing_error_ms)
    }

    /// Produces press and release events for every note, ordered by
    /// timestamp.
    pub fn script(&mut self, schedule: &Schedule) -> Vec<InputEvent> {
        // (press time, intended release time) per lane.
        let mut per_lane: [Vec<(f64, f64)>; 2] = Default::default();
        for note in &schedule.notes {
            for &lane in note.lanes.lanes() {
                let press = note.hit_time_ms + self.jitter();
                let release = if note.is_hold() {
                    press + note.hold_duration_ms + HOLD_OVERSHOOT_MS
                } else {
                    press + TAP_HOLD_MS
                };
                per_lane[lane.index()].push((press, release));
            }
        }

        let mut events = Vec::new();
        for lane in Lane::ALL {
            let strokes = &mut per_lane[lane.index()];
            strokes.sort_by(|a, b| a.0.total_cmp(&b.0));
            for (i, &(press, release)) in strokes.iter().enumerate() {
                let limit = strokes.get(i + 1).map_or(f64::INFINITY, |next| next.0 - 1.0);
                let release = release.min(limit).max(press + 1.0);
                events.push(InputEvent::press(lane, press));
                events.push(InputEvent::release(lane, release));
            }
        }
        events.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
        events
    }
}
