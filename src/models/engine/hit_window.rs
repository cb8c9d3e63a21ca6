//! Judgment thresholds and score tables.
//!
//! Tap notes are judged by distance from the hit zone, hold notes by the
//! fraction of their duration that was held. Both are plain tables so tuning
//! never touches control flow.

use crate::models::stats::Judgment;
use serde::{Deserialize, Serialize};

/// Distance thresholds for tap judgments, in playfield units.
///
/// Units are tied to the reference velocity of the playfield, so each
/// threshold is also a time window (see [`HitWindow::time_window_ms`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitWindow {
    pub perfect: f64,
    pub great: f64,
    pub good: f64,
    /// Outside this distance a press does not target the note at all.
    pub outer: f64,
}

impl HitWindow {
    pub fn new() -> Self {
        Self {
            perfect: 30.0,
            great: 60.0,
            good: 90.0,
            outer: 100.0,
        }
    }

    /// Utility constructor for fully custom values.
    pub fn from_custom(perfect: f64, great: f64, good: f64, outer: f64) -> Self {
        Self {
            perfect,
            great,
            good,
            outer,
        }
    }

    /// Judges a distance from the hit zone.
    ///
    /// Returns `None` beyond the outer window. Boundary values resolve to the
    /// better bucket; distances between `good` and `outer` are a miss.
    pub fn judge(&self, distance: f64) -> Option<Judgment> {
        let distance = distance.abs();

        if distance > self.outer {
            return None;
        }

        if distance <= self.perfect {
            Some(Judgment::Perfect)
        } else if distance <= self.great {
            Some(Judgment::Great)
        } else if distance <= self.good {
            Some(Judgment::Good)
        } else {
            Some(Judgment::Miss)
        }
    }

    /// Converts a distance threshold into milliseconds at `velocity` units/ms.
    pub fn time_window_ms(&self, distance: f64, velocity: f64) -> f64 {
        if velocity <= 0.0 {
            return 0.0;
        }
        distance / velocity
    }

    /// Returns true if the thresholds are positive and strictly ordered.
    pub fn is_ordered(&self) -> bool {
        self.perfect > 0.0
            && self.perfect < self.great
            && self.great < self.good
            && self.good <= self.outer
    }
}

impl Default for HitWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion-ratio thresholds for hold notes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldWindow {
    pub great_ratio: f64,
    pub good_ratio: f64,
}

impl HoldWindow {
    pub fn new() -> Self {
        Self {
            great_ratio: 0.9,
            good_ratio: 0.7,
        }
    }

    /// A full hold (ratio >= 1.0) is always perfect.
    pub fn judge(&self, ratio: f64) -> Judgment {
        if ratio >= 1.0 {
            Judgment::Perfect
        } else if ratio >= self.great_ratio {
            Judgment::Great
        } else if ratio >= self.good_ratio {
            Judgment::Good
        } else {
            Judgment::Miss
        }
    }
}

impl Default for HoldWindow {
    fn default() -> Self {
        Self::new()
    }
}

/// Points per judgment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JudgmentPoints {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
}

impl JudgmentPoints {
    pub fn points(&self, judgment: Judgment) -> u32 {
        match judgment {
            Judgment::Perfect => self.perfect,
            Judgment::Great => self.great,
            Judgment::Good => self.good,
            Judgment::Miss => self.miss,
        }
    }
}

/// Score awarded for judgments, hold completion and hold progress.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    /// Tap resolution and hold start.
    pub judgment: JudgmentPoints,
    /// Flat bonus on hold completion or release.
    pub hold_bonus: JudgmentPoints,
    /// Length of one progressive hold increment.
    pub hold_tick_ms: f64,
    /// Points per progressive hold increment.
    pub hold_tick_points: u32,
}

impl ScoreTable {
    pub fn new() -> Self {
        Self {
            judgment: JudgmentPoints {
                perfect: 300,
                great: 200,
                good: 100,
                miss: 0,
            },
            hold_bonus: JudgmentPoints {
                perfect: 500,
                great: 300,
                good: 100,
                miss: 0,
            },
            hold_tick_ms: 100.0,
            hold_tick_points: 10,
        }
    }
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self::new()
    }
}
