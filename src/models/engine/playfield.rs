//! Playfield geometry along the travel path.

use super::constants::DEFAULT_TRAVEL_TIME_MS;
use serde::{Deserialize, Serialize};

/// Positions along the travel path, in playfield units.
///
/// Notes move from `travel_start` down to `hit_zone` in `travel_time_ms` at a
/// constant velocity and keep going past it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayfieldConfig {
    pub travel_start: f64,
    pub hit_zone: f64,
    /// Distance past the hit zone after which an untouched note is missed.
    pub overrun_margin: f64,
    pub travel_time_ms: f64,
}

impl PlayfieldConfig {
    pub fn new() -> Self {
        Self {
            travel_start: 800.0,
            hit_zone: 100.0,
            overrun_margin: 100.0,
            travel_time_ms: DEFAULT_TRAVEL_TIME_MS,
        }
    }

    /// Units per millisecond.
    pub fn velocity(&self) -> f64 {
        (self.travel_start - self.hit_zone) / self.travel_time_ms
    }

    /// Position of a note due at `hit_time_ms`, observed at `now_ms`.
    pub fn position_at(&self, hit_time_ms: f64, now_ms: f64) -> f64 {
        self.hit_zone + (hit_time_ms - now_ms) * self.velocity()
    }

    /// Distance between a note due at `hit_time_ms` and the hit zone at `now_ms`.
    pub fn distance_at(&self, hit_time_ms: f64, now_ms: f64) -> f64 {
        (self.position_at(hit_time_ms, now_ms) - self.hit_zone).abs()
    }

    /// Position below which a note is considered overrun.
    pub fn miss_line(&self) -> f64 {
        self.hit_zone - self.overrun_margin
    }

    /// Returns true if a position has passed the hit zone by the overrun margin.
    pub fn is_overrun(&self, position: f64) -> bool {
        position < self.miss_line()
    }
}

impl Default for PlayfieldConfig {
    fn default() -> Self {
        Self::new()
    }
}
