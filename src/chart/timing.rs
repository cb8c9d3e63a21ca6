//! Conversion of chart data into an ordered note schedule.
//!
//! Grid charts are walked lane by lane to pair hold starts with their ends,
//! then merged across lanes so that simultaneous identical notes become one
//! dual-lane note. Every onset is then given a spawn time; notes that would
//! spawn before the song starts are dropped and reported.

use crate::chart::generator;
use crate::chart::source::ChartData;
use crate::error::ChartValidationError;
use crate::models::chart::{Chart, LANE_COUNT, Lane, LaneSet, NoteSymbol};
use crate::models::engine::{ChartNote, NoteType};
use crate::models::settings::EngineConfig;
use serde::Serialize;

/// A note with its hit time known but no spawn time yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteOnset {
    pub hit_time_ms: f64,
    pub lanes: LaneSet,
    pub note_type: NoteType,
    pub hold_duration_ms: f64,
    pub intensity: f32,
}

impl NoteOnset {
    pub fn tap(hit_time_ms: f64, lanes: LaneSet, intensity: f32) -> Self {
        Self {
            hit_time_ms,
            lanes,
            note_type: NoteType::Normal,
            hold_duration_ms: 0.0,
            intensity,
        }
    }

    pub fn hold(hit_time_ms: f64, lanes: LaneSet, duration_ms: f64, intensity: f32) -> Self {
        Self {
            hit_time_ms,
            lanes,
            note_type: NoteType::Hold,
            hold_duration_ms: duration_ms,
            intensity,
        }
    }

    fn end_time_ms(&self) -> f64 {
        self.hit_time_ms + self.hold_duration_ms
    }
}

/// Ordered notes ready for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schedule {
    /// Sorted by hit time, ties in declaration order.
    pub notes: Vec<ChartNote>,
    /// Notes whose spawn time would have been negative.
    pub dropped: Vec<ChartNote>,
    pub travel_time_ms: f64,
    pub min_separation_ms: f64,
    pub bpm: f64,
    /// Song time of the first beat.
    pub first_beat_ms: f64,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// End of the last note (hit time plus hold), zero when empty.
    pub fn last_end_ms(&self) -> f64 {
        self.notes
            .iter()
            .map(ChartNote::end_time_ms)
            .fold(0.0, f64::max)
    }

    /// Duration used for progress reporting.
    pub fn duration_ms(&self) -> f64 {
        self.last_end_ms()
    }

    /// Number of per-lane notes a session will judge.
    pub fn live_note_count(&self) -> usize {
        self.notes.iter().map(|n| n.lanes.lanes().len()).sum()
    }

    pub fn hold_count(&self) -> usize {
        self.notes.iter().filter(|n| n.is_hold()).count()
    }

    pub fn dual_count(&self) -> usize {
        self.notes.iter().filter(|n| n.lanes.is_dual()).count()
    }
}

/// Turns chart data into a [`Schedule`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartTimingModel {
    pub travel_time_ms: f64,
    pub min_separation_ms: f64,
}

impl ChartTimingModel {
    pub fn new(travel_time_ms: f64, min_separation_ms: f64) -> Self {
        Self {
            travel_time_ms,
            min_separation_ms,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.playfield.travel_time_ms,
            config.session.min_note_separation_ms,
        )
    }

    /// Validates and schedules chart data.
    pub fn build_schedule(&self, data: &ChartData) -> Result<Schedule, ChartValidationError> {
        let (onsets, bpm, first_beat_ms) = match data {
            ChartData::Grid(chart) => (self.grid_onsets(chart)?, chart.bpm, chart.offset_ms()),
            ChartData::Generated(spec) => (
                generator::generate(spec, self.min_separation_ms)?,
                spec.bpm,
                spec.offset_ms,
            ),
        };
        check_lane_spacing(&onsets, self.min_separation_ms)?;
        Ok(self.schedule(onsets, bpm, first_beat_ms))
    }

    /// Converts a grid chart into onsets in declaration order
    /// (measure, step, top before bottom).
    pub fn grid_onsets(&self, chart: &Chart) -> Result<Vec<NoteOnset>, ChartValidationError> {
        chart.validate()?;

        // (measure, step, lane index) -> onset, per lane, in walk order.
        let mut per_lane: [Vec<((usize, usize), NoteOnset)>; LANE_COUNT] = Default::default();

        for lane in Lane::ALL {
            let lane_set = LaneSet::single(lane);
            // Open hold: (measure, step, hit time, intensity).
            let mut open: Option<(usize, usize, f64, f32)> = None;

            for (m, measure) in chart.measures.iter().enumerate() {
                for (i, symbol) in chart.symbols(m, lane) {
                    let time = chart.step_time_ms(m, i);
                    match symbol {
                        NoteSymbol::Empty => {}
                        NoteSymbol::Tap | NoteSymbol::HoldStart if open.is_some() => {
                            return Err(ChartValidationError::OverlappingHold {
                                measure: m,
                                lane,
                                index: i,
                            });
                        }
                        NoteSymbol::Tap => {
                            per_lane[lane.index()]
                                .push(((m, i), NoteOnset::tap(time, lane_set, measure.intensity)));
                        }
                        NoteSymbol::HoldStart => {
                            open = Some((m, i, time, measure.intensity));
                        }
                        NoteSymbol::HoldEnd => {
                            let Some((sm, si, start, intensity)) = open.take() else {
                                return Err(ChartValidationError::StrayHoldEnd {
                                    measure: m,
                                    lane,
                                    index: i,
                                });
                            };
                            per_lane[lane.index()].push((
                                (sm, si),
                                NoteOnset::hold(start, lane_set, time - start, intensity),
                            ));
                        }
                    }
                }
            }

            if let Some((_, _, start, _)) = open {
                return Err(ChartValidationError::UnterminatedHold {
                    lane,
                    hit_time_ms: start,
                });
            }
        }

        // Holds are pushed at their end step; restore onset order.
        for lane_notes in per_lane.iter_mut() {
            lane_notes.sort_by_key(|(pos, _)| *pos);
        }

        Ok(merge_lanes(per_lane))
    }

    /// Assigns spawn times, drops notes that would spawn before zero and
    /// sorts by hit time.
    pub fn schedule(&self, onsets: Vec<NoteOnset>, bpm: f64, first_beat_ms: f64) -> Schedule {
        let mut notes = Vec::with_capacity(onsets.len());
        let mut dropped = Vec::new();

        for onset in onsets {
            let note = ChartNote {
                spawn_time_ms: onset.hit_time_ms - self.travel_time_ms,
                hit_time_ms: onset.hit_time_ms,
                lanes: onset.lanes,
                note_type: onset.note_type,
                hold_duration_ms: onset.hold_duration_ms,
                intensity: onset.intensity,
            };
            if note.spawn_time_ms < 0.0 {
                log::warn!(
                    "CHART: Dropping note at {:.1} ms, spawn time {:.1} ms is negative",
                    note.hit_time_ms,
                    note.spawn_time_ms
                );
                dropped.push(note);
            } else {
                notes.push(note);
            }
        }

        // Stable: equal hit times keep declaration order.
        notes.sort_by(|a, b| a.hit_time_ms.total_cmp(&b.hit_time_ms));

        log::info!(
            "CHART: Scheduled {} notes ({} dropped) at {} bpm",
            notes.len(),
            dropped.len(),
            bpm
        );

        Schedule {
            notes,
            dropped,
            travel_time_ms: self.travel_time_ms,
            min_separation_ms: self.min_separation_ms,
            bpm,
            first_beat_ms,
        }
    }
}

/// Interleaves per-lane onsets in (measure, step, lane) order, merging
/// identical notes on the same step into one dual-lane note.
fn merge_lanes(per_lane: [Vec<((usize, usize), NoteOnset)>; LANE_COUNT]) -> Vec<NoteOnset> {
    let [top, bottom] = per_lane;
    let mut out = Vec::with_capacity(top.len() + bottom.len());
    let mut top = top.into_iter().peekable();
    let mut bottom = bottom.into_iter().peekable();

    loop {
        let next = match (top.peek(), bottom.peek()) {
            (None, None) => break,
            (Some(_), None) => top.next(),
            (None, Some(_)) => bottom.next(),
            (Some((tp, t)), Some((bp, b))) => {
                if tp == bp
                    && t.note_type == b.note_type
                    && t.hold_duration_ms == b.hold_duration_ms
                {
                    let mut merged = top.next().map(|(_, n)| n);
                    bottom.next();
                    if let Some(n) = merged.as_mut() {
                        n.lanes = LaneSet::Both;
                    }
                    out.extend(merged);
                    continue;
                }
                if tp <= bp { top.next() } else { bottom.next() }
            }
        };
        out.extend(next.map(|(_, n)| n));
    }
    out
}

/// Rejects same-lane onsets whose hit times are closer than
/// `min_separation_ms`, and onsets that land inside a hold in the same lane.
/// An onset may follow a hold end by any gap.
pub fn check_lane_spacing(
    onsets: &[NoteOnset],
    min_separation_ms: f64,
) -> Result<(), ChartValidationError> {
    for lane in Lane::ALL {
        let mut lane_notes: Vec<&NoteOnset> =
            onsets.iter().filter(|n| n.lanes.contains(lane)).collect();
        lane_notes.sort_by(|a, b| a.hit_time_ms.total_cmp(&b.hit_time_ms));

        for pair in lane_notes.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            let gap = next.hit_time_ms - prev.hit_time_ms;
            if gap < min_separation_ms || next.hit_time_ms < prev.end_time_ms() {
                return Err(ChartValidationError::OnsetCollision {
                    lane,
                    first_ms: prev.hit_time_ms,
                    second_ms: next.hit_time_ms,
                    min_separation_ms,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chart::Measure;

    fn chart(measures: Vec<Measure>) -> Chart {
        Chart {
            bpm: 120.0,
            subdivision: 16,
            beats_per_measure: 4,
            offset_seconds: 0.0,
            measures,
        }
    }

    fn model(travel: f64) -> ChartTimingModel {
        ChartTimingModel::new(travel, 100.0)
    }

    #[test]
    fn test_quarter_note_onsets() {
        let c = chart(vec![Measure::new("1000100010001000", "0000000000000000")]);
        let onsets = model(0.0).grid_onsets(&c).unwrap();
        let times: Vec<f64> = onsets.iter().map(|n| n.hit_time_ms).collect();
        assert_eq!(times, vec![0.0, 500.0, 1000.0, 1500.0]);
        assert!(onsets.iter().all(|n| n.lanes == LaneSet::Top));
    }

    #[test]
    fn test_schedule_without_travel_keeps_all_notes() {
        let c = chart(vec![Measure::new("1000100010001000", "0000000000000000")]);
        let schedule = model(0.0).build_schedule(&ChartData::Grid(c)).unwrap();
        assert_eq!(schedule.len(), 4);
        assert!(schedule.dropped.is_empty());
    }

    #[test]
    fn test_negative_spawn_notes_are_dropped_not_shifted() {
        let c = chart(vec![Measure::new("1000100010001000", "0000000000000000")]);
        let schedule = model(1000.0).build_schedule(&ChartData::Grid(c)).unwrap();
        let times: Vec<f64> = schedule.notes.iter().map(|n| n.hit_time_ms).collect();
        assert_eq!(times, vec![1000.0, 1500.0]);
        assert_eq!(schedule.dropped.len(), 2);
        assert_eq!(schedule.notes[0].spawn_time_ms, 0.0);
        assert!(schedule.notes.iter().all(|n| n.spawn_time_ms >= 0.0));
    }

    #[test]
    fn test_identical_notes_on_same_step_merge() {
        let c = chart(vec![Measure::new("1000100000000000", "1000000010000000")]);
        let onsets = model(0.0).grid_onsets(&c).unwrap();
        assert_eq!(onsets.len(), 3);
        assert_eq!(onsets[0].lanes, LaneSet::Both);
        assert_eq!(onsets[1].lanes, LaneSet::Top);
        assert_eq!(onsets[2].lanes, LaneSet::Bottom);
    }

    #[test]
    fn test_hold_pairs_across_measures() {
        let c = chart(vec![
            Measure::new("0000000000002000", "0000000000000000"),
            Measure::new("0000300000000000", "0000000000000000"),
        ]);
        let onsets = model(0.0).grid_onsets(&c).unwrap();
        assert_eq!(onsets.len(), 1);
        assert_eq!(onsets[0].note_type, NoteType::Hold);
        assert_eq!(onsets[0].hit_time_ms, 1500.0);
        assert_eq!(onsets[0].hold_duration_ms, 1000.0);
    }

    #[test]
    fn test_hold_errors() {
        let stray = chart(vec![Measure::new("3000000000000000", "0000000000000000")]);
        assert!(matches!(
            model(0.0).grid_onsets(&stray),
            Err(ChartValidationError::StrayHoldEnd { index: 0, .. })
        ));

        let overlap = chart(vec![Measure::new("2000100030000000", "0000000000000000")]);
        assert!(matches!(
            model(0.0).grid_onsets(&overlap),
            Err(ChartValidationError::OverlappingHold { index: 4, .. })
        ));

        let open = chart(vec![Measure::new("0000000000000000", "0000200000000000")]);
        assert_eq!(
            model(0.0).grid_onsets(&open),
            Err(ChartValidationError::UnterminatedHold {
                lane: Lane::Bottom,
                hit_time_ms: 500.0
            })
        );
    }

    #[test]
    fn test_close_onsets_are_rejected() {
        // Sixteenth notes at 180 bpm are 83 ms apart.
        let mut c = chart(vec![Measure::new("1100000000000000", "0000000000000000")]);
        c.bpm = 180.0;
        let err = model(0.0).build_schedule(&ChartData::Grid(c)).unwrap_err();
        assert!(matches!(
            err,
            ChartValidationError::OnsetCollision { lane: Lane::Top, .. }
        ));
    }

    #[test]
    fn test_spacing_is_measured_between_hit_times() {
        let hold = NoteOnset::hold(0.0, LaneSet::Top, 500.0, 0.5);
        // 50 ms after the hold end, 550 ms after its start.
        let after = NoteOnset::tap(550.0, LaneSet::Top, 0.5);
        assert!(check_lane_spacing(&[hold.clone(), after], 100.0).is_ok());

        let inside = NoteOnset::tap(400.0, LaneSet::Top, 0.5);
        assert!(matches!(
            check_lane_spacing(&[hold, inside], 100.0),
            Err(ChartValidationError::OnsetCollision { lane: Lane::Top, .. })
        ));
    }

    #[test]
    fn test_pattern_length_fails_before_scheduling() {
        let c = chart(vec![Measure::new("10001000", "0000000000000000")]);
        assert!(matches!(
            model(0.0).build_schedule(&ChartData::Grid(c)),
            Err(ChartValidationError::PatternLength { .. })
        ));
    }

    #[test]
    fn test_sort_is_stable_for_equal_hit_times() {
        let onsets = vec![
            NoteOnset::tap(500.0, LaneSet::Bottom, 0.5),
            NoteOnset::tap(0.0, LaneSet::Top, 0.5),
            NoteOnset::tap(500.0, LaneSet::Top, 0.5),
        ];
        let schedule = model(0.0).schedule(onsets, 120.0, 0.0);
        assert_eq!(schedule.notes[1].lanes, LaneSet::Bottom);
        assert_eq!(schedule.notes[2].lanes, LaneSet::Top);
        assert_eq!(schedule.last_end_ms(), 500.0);
    }
}
