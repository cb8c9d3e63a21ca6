//! Declarative beat-grid chart data.
//!
//! A chart is a tempo, a grid resolution and a list of measures. Each measure
//! carries one pattern string per lane, one character per grid step.

use crate::error::ChartValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of input lanes.
pub const LANE_COUNT: usize = 2;

/// One of the fixed input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Top,
    Bottom,
}

impl Lane {
    /// Both lanes, in declaration order.
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Top, Lane::Bottom];

    /// Index into per-lane arrays.
    pub fn index(self) -> usize {
        match self {
            Lane::Top => 0,
            Lane::Bottom => 1,
        }
    }

    pub fn other(self) -> Lane {
        match self {
            Lane::Top => Lane::Bottom,
            Lane::Bottom => Lane::Top,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Top => f.write_str("top"),
            Lane::Bottom => f.write_str("bottom"),
        }
    }
}

/// The lanes a scheduled note occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneSet {
    Top,
    Bottom,
    Both,
}

impl LaneSet {
    pub fn single(lane: Lane) -> Self {
        match lane {
            Lane::Top => LaneSet::Top,
            Lane::Bottom => LaneSet::Bottom,
        }
    }

    /// Lanes in declaration order (top first).
    pub fn lanes(self) -> &'static [Lane] {
        match self {
            LaneSet::Top => &[Lane::Top],
            LaneSet::Bottom => &[Lane::Bottom],
            LaneSet::Both => &Lane::ALL,
        }
    }

    pub fn contains(self, lane: Lane) -> bool {
        self.lanes().contains(&lane)
    }

    pub fn is_dual(self) -> bool {
        self == LaneSet::Both
    }
}

/// Closed alphabet of pattern characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteSymbol {
    /// `0`: nothing on this step.
    Empty,
    /// `1`: a tap note.
    Tap,
    /// `2`: a hold note starts here.
    HoldStart,
    /// `3`: the open hold in this lane ends here.
    HoldEnd,
}

impl NoteSymbol {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(NoteSymbol::Empty),
            '1' => Some(NoteSymbol::Tap),
            '2' => Some(NoteSymbol::HoldStart),
            '3' => Some(NoteSymbol::HoldEnd),
            _ => None,
        }
    }

    /// Returns true if the symbol starts a new note.
    pub fn is_onset(self) -> bool {
        matches!(self, NoteSymbol::Tap | NoteSymbol::HoldStart)
    }
}

fn default_intensity() -> f32 {
    0.5
}

/// One measure of the grid, one pattern per lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    #[serde(default, alias = "topLane")]
    pub top: String,
    #[serde(default, alias = "bottomLane")]
    pub bottom: String,
    /// Relative density used by adaptive difficulty (0.0 - 1.0).
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

impl Measure {
    pub fn new(top: &str, bottom: &str) -> Self {
        Self {
            top: top.to_string(),
            bottom: bottom.to_string(),
            intensity: default_intensity(),
        }
    }

    pub fn pattern(&self, lane: Lane) -> &str {
        match lane {
            Lane::Top => &self.top,
            Lane::Bottom => &self.bottom,
        }
    }
}

/// An immutable beat-grid chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub bpm: f64,
    pub subdivision: u32,
    #[serde(default = "default_beats_per_measure")]
    pub beats_per_measure: u32,
    #[serde(default)]
    pub offset_seconds: f64,
    pub measures: Vec<Measure>,
}

fn default_beats_per_measure() -> u32 {
    4
}

impl Chart {
    pub fn offset_ms(&self) -> f64 {
        self.offset_seconds * 1000.0
    }

    pub fn beat_interval_ms(&self) -> f64 {
        60_000.0 / self.bpm
    }

    /// Absolute hit time of grid step `index` in measure `measure`.
    pub fn step_time_ms(&self, measure: usize, index: usize) -> f64 {
        let beats_per_measure = self.beats_per_measure as f64;
        let beat_position = (index as f64 / self.subdivision as f64) * beats_per_measure;
        let absolute_beat = measure as f64 * beats_per_measure + beat_position;
        absolute_beat * self.beat_interval_ms() + self.offset_ms()
    }

    /// Checks tempo, grid and per-measure pattern shape.
    ///
    /// Timing rules that need absolute times (hold pairing, onset spacing)
    /// are checked while scheduling.
    pub fn validate(&self) -> Result<(), ChartValidationError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(ChartValidationError::InvalidTempo { bpm: self.bpm });
        }
        if !self.offset_seconds.is_finite() {
            return Err(ChartValidationError::InvalidOffset {
                offset_ms: self.offset_ms(),
            });
        }
        if self.subdivision == 0 {
            return Err(ChartValidationError::InvalidSubdivision);
        }
        if self.beats_per_measure == 0 {
            return Err(ChartValidationError::InvalidMeasureLength);
        }

        let expected = self.subdivision as usize;
        for (m, measure) in self.measures.iter().enumerate() {
            for lane in Lane::ALL {
                let pattern = measure.pattern(lane);
                let found = pattern.chars().count();
                if found != expected {
                    return Err(ChartValidationError::PatternLength {
                        measure: m,
                        lane,
                        expected,
                        found,
                    });
                }
                if let Some((index, symbol)) = pattern
                    .chars()
                    .enumerate()
                    .find(|(_, c)| NoteSymbol::from_char(*c).is_none())
                {
                    return Err(ChartValidationError::InvalidSymbol {
                        measure: m,
                        lane,
                        index,
                        symbol,
                    });
                }
            }
        }
        Ok(())
    }

    /// Iterates over the parsed symbols of one lane in one measure.
    ///
    /// Only meaningful after `validate`; unknown characters are skipped.
    pub fn symbols(&self, measure: usize, lane: Lane) -> impl Iterator<Item = (usize, NoteSymbol)> + '_ {
        self.measures[measure]
            .pattern(lane)
            .chars()
            .enumerate()
            .filter_map(|(i, c)| NoteSymbol::from_char(c).map(|s| (i, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(top: &str, bottom: &str) -> Chart {
        Chart {
            bpm: 120.0,
            subdivision: 16,
            beats_per_measure: 4,
            offset_seconds: 0.0,
            measures: vec![Measure::new(top, bottom)],
        }
    }

    #[test]
    fn test_step_time_quarter_notes() {
        let c = chart("1000100010001000", "0000000000000000");
        assert_eq!(c.step_time_ms(0, 0), 0.0);
        assert_eq!(c.step_time_ms(0, 4), 500.0);
        assert_eq!(c.step_time_ms(1, 0), 2000.0);
    }

    #[test]
    fn test_offset_applies_to_every_step() {
        let mut c = chart("1000100010001000", "0000000000000000");
        c.offset_seconds = 0.25;
        assert_eq!(c.step_time_ms(0, 4), 750.0);
    }

    #[test]
    fn test_pattern_length_is_checked_per_lane() {
        let c = chart("1000100010001000", "000");
        assert_eq!(
            c.validate(),
            Err(ChartValidationError::PatternLength {
                measure: 0,
                lane: Lane::Bottom,
                expected: 16,
                found: 3,
            })
        );
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let c = chart("10001000x0001000", "0000000000000000");
        assert!(matches!(
            c.validate(),
            Err(ChartValidationError::InvalidSymbol { index: 8, symbol: 'x', .. })
        ));
    }

    #[test]
    fn test_zero_tempo_is_rejected() {
        let mut c = chart("1000100010001000", "0000000000000000");
        c.bpm = 0.0;
        assert!(matches!(c.validate(), Err(ChartValidationError::InvalidTempo { .. })));
    }

    #[test]
    fn test_non_finite_offset_is_rejected() {
        let mut c = chart("1000100010001000", "0000000000000000");
        c.offset_seconds = f64::NAN;
        assert!(matches!(c.validate(), Err(ChartValidationError::InvalidOffset { .. })));
        c.offset_seconds = f64::INFINITY;
        assert!(matches!(c.validate(), Err(ChartValidationError::InvalidOffset { .. })));
    }

    #[test]
    fn test_chart_json_uses_camel_case() {
        let json = r#"{
            "bpm": 120,
            "subdivision": 4,
            "beatsPerMeasure": 4,
            "offsetSeconds": 0.5,
            "measures": [{ "topLane": "1010", "bottomLane": "0101" }]
        }"#;
        let c: Chart = serde_json::from_str(json).unwrap();
        assert_eq!(c.offset_ms(), 500.0);
        assert_eq!(c.measures[0].pattern(Lane::Bottom), "0101");
        assert_eq!(c.measures[0].intensity, 0.5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_lane_set_lanes_keep_declaration_order() {
        assert_eq!(LaneSet::Both.lanes(), &[Lane::Top, Lane::Bottom]);
        assert!(LaneSet::single(Lane::Bottom).contains(Lane::Bottom));
        assert!(!LaneSet::Top.contains(Lane::Bottom));
    }
}
