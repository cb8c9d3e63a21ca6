//! Error types for chart loading and session control.

use crate::models::chart::Lane;
use thiserror::Error;

/// A chart that cannot be scheduled as written.
///
/// Raised before any note is scheduled. Nothing in the engine tries to repair
/// the chart; the caller gets the first rule that failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartValidationError {
    #[error("tempo must be positive, got {bpm} bpm")]
    InvalidTempo { bpm: f64 },

    #[error("offset must be finite, got {offset_ms} ms")]
    InvalidOffset { offset_ms: f64 },

    #[error("subdivision must be at least 1")]
    InvalidSubdivision,

    #[error("beats per measure must be at least 1")]
    InvalidMeasureLength,

    #[error(
        "measure {measure}, {lane} lane: pattern has {found} steps, expected {expected}"
    )]
    PatternLength {
        measure: usize,
        lane: Lane,
        expected: usize,
        found: usize,
    },

    #[error("measure {measure}, {lane} lane, step {index}: unknown symbol {symbol:?}")]
    InvalidSymbol {
        measure: usize,
        lane: Lane,
        index: usize,
        symbol: char,
    },

    #[error("measure {measure}, {lane} lane, step {index}: hold end without a hold start")]
    StrayHoldEnd {
        measure: usize,
        lane: Lane,
        index: usize,
    },

    #[error("measure {measure}, {lane} lane, step {index}: note starts inside an open hold")]
    OverlappingHold {
        measure: usize,
        lane: Lane,
        index: usize,
    },

    #[error("{lane} lane: hold starting at {hit_time_ms:.1} ms is never closed")]
    UnterminatedHold { lane: Lane, hit_time_ms: f64 },

    #[error(
        "{lane} lane: onsets at {first_ms:.1} ms and {second_ms:.1} ms are closer than {min_separation_ms} ms"
    )]
    OnsetCollision {
        lane: Lane,
        first_ms: f64,
        second_ms: f64,
        min_separation_ms: f64,
    },

    #[error("generated chart needs a positive duration, got {duration_ms} ms")]
    InvalidDuration { duration_ms: f64 },

    #[error("step of {step_ms:.1} ms is shorter than the {min_separation_ms} ms note separation")]
    StepTooShort { step_ms: f64, min_separation_ms: f64 },
}

/// Session lifecycle states, used in transition errors and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Stopped,
    Finished,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
            SessionState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Top-level error for everything that can halt a session or a load.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("chart validation failed: {0}")]
    Chart(#[from] ChartValidationError),

    #[error("invalid engine configuration: {0}")]
    Config(String),

    #[error("cannot {action} a session that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
