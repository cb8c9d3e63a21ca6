//! Engine-wide defaults.

/// Number of lanes a chart can place notes in.
pub use crate::models::chart::LANE_COUNT;

/// Minimum spacing between two onsets in the same lane.
pub const MIN_NOTE_SEPARATION_MS: f64 = 100.0;

/// Time a note takes from spawn to the hit zone.
pub const DEFAULT_TRAVEL_TIME_MS: f64 = 2000.0;

/// Fraction of the beat interval after which the next beat may fire.
pub const BEAT_TOLERANCE: f64 = 0.95;

/// Time after the last note end before a session finishes on its own.
pub const FINISH_GRACE_MS: f64 = 2000.0;

/// Nominal update rate of the driving tick.
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
