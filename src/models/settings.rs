//! Engine configuration, loaded from TOML.
//!
//! Every section falls back to its defaults, so a config file only needs the
//! values it changes:
//!
//! ```toml
//! [playfield]
//! travel_time_ms = 1500.0
//!
//! [session]
//! input_offset_ms = -12.0
//! ```

use crate::error::EngineError;
use crate::models::engine::constants::{
    BEAT_TOLERANCE, DEFAULT_TICK_RATE_HZ, FINISH_GRACE_MS, MIN_NOTE_SEPARATION_MS,
};
use crate::models::engine::{HitWindow, HoldWindow, PlayfieldConfig, ScoreTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Beat detection and audio drift correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fraction of the beat interval after which a beat may fire.
    pub beat_tolerance: f64,
    /// Drift beyond which the clock jumps to the audio position.
    pub drift_snap_ms: f64,
    /// Drift beyond which the clock is nudged toward the audio position.
    pub drift_nudge_ms: f64,
    /// Fraction of the drift applied per nudge.
    pub drift_nudge_factor: f64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            beat_tolerance: BEAT_TOLERANCE,
            drift_snap_ms: 80.0,
            drift_nudge_ms: 5.0,
            drift_nudge_factor: 0.05,
        }
    }
}

/// Session pacing and input handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub tick_rate_hz: u32,
    /// Added to every input timestamp before judging.
    pub input_offset_ms: f64,
    pub finish_grace_ms: f64,
    pub min_note_separation_ms: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: DEFAULT_TICK_RATE_HZ,
            input_offset_ms: 0.0,
            finish_grace_ms: FINISH_GRACE_MS,
            min_note_separation_ms: MIN_NOTE_SEPARATION_MS,
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub playfield: PlayfieldConfig,
    pub hit_window: HitWindow,
    pub hold_window: HoldWindow,
    pub scoring: ScoreTable,
    pub clock: ClockConfig,
    pub session: SessionConfig,
}

impl EngineConfig {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        log::info!("CONFIG: Loaded engine config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Rejects values the engine cannot run with.
    pub fn validate(&self) -> Result<(), EngineError> {
        let p = &self.playfield;
        if !(p.travel_time_ms > 0.0) {
            return Err(EngineError::Config(format!(
                "travel_time_ms must be positive, got {}",
                p.travel_time_ms
            )));
        }
        if !(p.travel_start > p.hit_zone) {
            return Err(EngineError::Config(
                "travel_start must lie above hit_zone".to_string(),
            ));
        }
        if p.overrun_margin < 0.0 {
            return Err(EngineError::Config(
                "overrun_margin cannot be negative".to_string(),
            ));
        }
        if !self.hit_window.is_ordered() {
            return Err(EngineError::Config(
                "hit window thresholds must be positive and increasing".to_string(),
            ));
        }
        let h = &self.hold_window;
        if !(0.0 < h.good_ratio && h.good_ratio <= h.great_ratio && h.great_ratio <= 1.0) {
            return Err(EngineError::Config(
                "hold ratios must satisfy 0 < good <= great <= 1".to_string(),
            ));
        }
        if !(self.scoring.hold_tick_ms > 0.0) {
            return Err(EngineError::Config(
                "hold_tick_ms must be positive".to_string(),
            ));
        }
        if !(self.clock.beat_tolerance > 0.0 && self.clock.beat_tolerance <= 1.0) {
            return Err(EngineError::Config(
                "beat_tolerance must be in (0, 1]".to_string(),
            ));
        }
        if self.session.tick_rate_hz == 0 {
            return Err(EngineError::Config(
                "tick_rate_hz must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load a TOML file and deserialize it
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, EngineError> {
    let content = fs::read_to_string(path)?;
    match toml::from_str(&content) {
        Ok(data) => Ok(data),
        Err(e) => {
            log::error!("CONFIG: Failed to parse TOML file {:?}: {}", path, e);
            Err(e.into())
        }
    }
}
