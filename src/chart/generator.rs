//! Procedural chart generation from song sections.
//!
//! The song is split into intro, verse, buildup, drop, breakdown and outro by
//! fixed shares of its duration. Each section walks its own pattern table one
//! step at a time and restarts the table at a fixed beat interval.

use crate::chart::timing::NoteOnset;
use crate::error::ChartValidationError;
use crate::models::chart::LaneSet;
use serde::{Deserialize, Serialize};

/// Request for a generated chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorSpec {
    pub bpm: f64,
    pub duration_ms: f64,
    #[serde(default)]
    pub offset_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Intro,
    Verse,
    Buildup,
    Drop,
    Breakdown,
    Outro,
}

/// One entry of a pattern table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Rest,
    Tap(LaneSet),
    /// Hold lasting the given number of beats.
    Hold(LaneSet, f64),
}

/// How a section places notes.
#[derive(Debug, Clone, Copy)]
pub struct SectionPattern {
    pub steps: &'static [Step],
    /// Step length in beats.
    pub step_beats: f64,
    /// The table index returns to zero every this many beats.
    pub reset_beats: f64,
}

use self::Step::{Hold, Rest, Tap};
use crate::models::chart::LaneSet::{Both, Bottom, Top};

const INTRO: &[Step] = &[Tap(Top), Rest, Tap(Bottom), Rest];
const VERSE: &[Step] = &[Tap(Top), Rest, Tap(Bottom), Tap(Top), Rest, Tap(Bottom), Tap(Top), Tap(Bottom)];
const BUILDUP: &[Step] = &[Tap(Top), Tap(Bottom), Tap(Top), Tap(Bottom), Tap(Both), Rest];
const DROP: &[Step] = &[Tap(Both), Tap(Top), Tap(Bottom), Tap(Top), Hold(Both, 1.0), Rest, Rest, Tap(Bottom)];
const BREAKDOWN: &[Step] = &[Hold(Top, 1.5), Rest, Hold(Bottom, 1.5), Rest];
const OUTRO: &[Step] = &[Tap(Both), Rest, Rest, Rest];

impl SectionKind {
    pub const ORDER: [SectionKind; 6] = [
        SectionKind::Intro,
        SectionKind::Verse,
        SectionKind::Buildup,
        SectionKind::Drop,
        SectionKind::Breakdown,
        SectionKind::Outro,
    ];

    /// Fraction of the song this section covers.
    pub fn share(self) -> f64 {
        match self {
            SectionKind::Intro => 0.10,
            SectionKind::Verse => 0.25,
            SectionKind::Buildup => 0.15,
            SectionKind::Drop => 0.25,
            SectionKind::Breakdown => 0.15,
            SectionKind::Outro => 0.10,
        }
    }

    pub fn intensity(self) -> f32 {
        match self {
            SectionKind::Intro => 0.2,
            SectionKind::Verse => 0.5,
            SectionKind::Buildup => 0.7,
            SectionKind::Drop => 1.0,
            SectionKind::Breakdown => 0.4,
            SectionKind::Outro => 0.2,
        }
    }

    pub fn pattern(self) -> SectionPattern {
        match self {
            SectionKind::Intro => SectionPattern { steps: INTRO, step_beats: 1.0, reset_beats: 4.0 },
            SectionKind::Verse => SectionPattern { steps: VERSE, step_beats: 0.5, reset_beats: 8.0 },
            SectionKind::Buildup => SectionPattern { steps: BUILDUP, step_beats: 0.5, reset_beats: 4.0 },
            SectionKind::Drop => SectionPattern { steps: DROP, step_beats: 0.5, reset_beats: 4.0 },
            SectionKind::Breakdown => SectionPattern { steps: BREAKDOWN, step_beats: 1.0, reset_beats: 8.0 },
            SectionKind::Outro => SectionPattern { steps: OUTRO, step_beats: 1.0, reset_beats: 4.0 },
        }
    }
}

/// A section placed on the song timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub start_ms: f64,
    pub end_ms: f64,
}

/// Splits `[offset, offset + duration)` into sections by share.
pub fn sections(spec: &GeneratorSpec) -> Vec<Section> {
    let mut start = spec.offset_ms;
    SectionKind::ORDER
        .iter()
        .map(|&kind| {
            let end = start + spec.duration_ms * kind.share();
            let section = Section {
                kind,
                start_ms: start,
                end_ms: end,
            };
            start = end;
            section
        })
        .collect()
}

/// Generates onsets for every section.
///
/// Steps start on the first whole beat of each section. A hold that would run
/// past its section end is placed as a tap instead.
pub fn generate(
    spec: &GeneratorSpec,
    min_separation_ms: f64,
) -> Result<Vec<NoteOnset>, ChartValidationError> {
    if !(spec.bpm.is_finite() && spec.bpm > 0.0) {
        return Err(ChartValidationError::InvalidTempo { bpm: spec.bpm });
    }
    if !spec.offset_ms.is_finite() {
        return Err(ChartValidationError::InvalidOffset {
            offset_ms: spec.offset_ms,
        });
    }
    if !(spec.duration_ms.is_finite() && spec.duration_ms > 0.0) {
        return Err(ChartValidationError::InvalidDuration {
            duration_ms: spec.duration_ms,
        });
    }

    let beat_ms = 60_000.0 / spec.bpm;
    let mut onsets = Vec::new();

    for section in sections(spec) {
        let pattern = section.kind.pattern();
        let step_ms = pattern.step_beats * beat_ms;
        if step_ms < min_separation_ms {
            return Err(ChartValidationError::StepTooShort {
                step_ms,
                min_separation_ms,
            });
        }

        let steps_per_reset = ((pattern.reset_beats / pattern.step_beats).round() as usize).max(1);
        let first_beat = ((section.start_ms - spec.offset_ms) / beat_ms).ceil();
        let origin = spec.offset_ms + first_beat * beat_ms;
        let intensity = section.kind.intensity();

        let mut step_count = 0usize;
        loop {
            let time = origin + step_count as f64 * step_ms;
            if time >= section.end_ms {
                break;
            }
            let cycle_index = (step_count % steps_per_reset) % pattern.steps.len();
            match pattern.steps[cycle_index] {
                Rest => {}
                Tap(lanes) => onsets.push(NoteOnset::tap(time, lanes, intensity)),
                Hold(lanes, beats) => {
                    let duration = beats * beat_ms;
                    if time + duration < section.end_ms {
                        onsets.push(NoteOnset::hold(time, lanes, duration, intensity));
                    } else {
                        onsets.push(NoteOnset::tap(time, lanes, intensity));
                    }
                }
            }
            step_count += 1;
        }

        log::debug!(
            "CHART: Generated {:?} section {:.0}-{:.0} ms",
            section.kind,
            section.start_ms,
            section.end_ms
        );
    }

    Ok(onsets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::timing::check_lane_spacing;

    fn spec(bpm: f64, duration_ms: f64) -> GeneratorSpec {
        GeneratorSpec {
            bpm,
            duration_ms,
            offset_ms: 0.0,
        }
    }

    #[test]
    fn test_sections_cover_the_song() {
        let secs = sections(&spec(120.0, 60_000.0));
        assert_eq!(secs.len(), 6);
        assert_eq!(secs[0].start_ms, 0.0);
        assert!((secs[5].end_ms - 60_000.0).abs() < 1e-6);
        for pair in secs.windows(2) {
            assert_eq!(pair[0].end_ms, pair[1].start_ms);
        }
        let total: f64 = SectionKind::ORDER.iter().map(|k| k.share()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_intro_cycles_its_table() {
        let onsets = generate(&spec(120.0, 60_000.0), 100.0).unwrap();
        // Intro covers 0-6000 ms at one step per beat.
        let intro: Vec<&NoteOnset> = onsets.iter().filter(|n| n.hit_time_ms < 6000.0).collect();
        assert_eq!(intro.len(), 6);
        assert_eq!(intro[0].lanes, LaneSet::Top);
        assert_eq!(intro[1].lanes, LaneSet::Bottom);
        assert_eq!(intro[1].hit_time_ms, 1000.0);
        assert_eq!(intro[2].lanes, LaneSet::Top);
        assert!(intro.iter().all(|n| n.intensity == 0.2));
    }

    #[test]
    fn test_cycle_resets_each_interval() {
        // Buildup: 6-step table, reset every 8 half-beat steps.
        let onsets = generate(&spec(120.0, 60_000.0), 100.0).unwrap();
        let buildup: Vec<&NoteOnset> = onsets
            .iter()
            .filter(|n| n.intensity == 0.7)
            .collect();
        // Steps 0..8: T B T B Both Rest T B, then back to T.
        assert_eq!(buildup[4].lanes, LaneSet::Both);
        assert_eq!(buildup[5].lanes, LaneSet::Top);
        assert_eq!(buildup[6].lanes, LaneSet::Bottom);
        assert_eq!(buildup[7].lanes, LaneSet::Top);
        assert_eq!(buildup[7].hit_time_ms - buildup[0].hit_time_ms, 2000.0);
    }

    #[test]
    fn test_generated_chart_respects_spacing() {
        for bpm in [90.0, 120.0, 174.0, 240.0] {
            let onsets = generate(&spec(bpm, 90_000.0), 100.0).unwrap();
            assert!(!onsets.is_empty());
            assert!(check_lane_spacing(&onsets, 100.0).is_ok(), "bpm {bpm}");
        }
    }

    #[test]
    fn test_rejects_bad_requests() {
        assert!(matches!(
            generate(&spec(0.0, 1000.0), 100.0),
            Err(ChartValidationError::InvalidTempo { .. })
        ));
        assert!(matches!(
            generate(&spec(120.0, -1.0), 100.0),
            Err(ChartValidationError::InvalidDuration { .. })
        ));
        assert!(matches!(
            generate(
                &GeneratorSpec { bpm: 120.0, duration_ms: 1000.0, offset_ms: f64::NAN },
                100.0
            ),
            Err(ChartValidationError::InvalidOffset { .. })
        ));
        // Half-beat steps at 400 bpm are 75 ms.
        assert!(matches!(
            generate(&spec(400.0, 60_000.0), 100.0),
            Err(ChartValidationError::StepTooShort { .. })
        ));
    }
}
