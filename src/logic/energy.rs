//! Low-frequency energy analysis for diagnostic beat candidates.
//!
//! Samples pass through a one-pole low-pass filter; the RMS energy of each
//! block is compared with the running average of recent blocks. A block well
//! above the average is a candidate beat. Candidates are only ever logged,
//! the clock's beat schedule never depends on them.

use std::collections::VecDeque;

/// Cutoff of the low-pass filter, targeting kick and bass content.
const DEFAULT_CUTOFF_HZ: f32 = 150.0;
/// Blocks of history in the running average (~1 s of 1024-sample blocks at 44.1 kHz).
const HISTORY_BLOCKS: usize = 43;
/// Energy ratio above the average that flags a candidate.
const DEFAULT_SENSITIVITY: f32 = 1.5;

/// Energy of a block that stood out from its recent history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatCandidate {
    pub energy: f32,
    pub average: f32,
}

pub struct EnergyBeatDetector {
    alpha: f32,
    filtered: f32,
    sensitivity: f32,
    history: VecDeque<f32>,
}

impl EnergyBeatDetector {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_params(sample_rate, DEFAULT_CUTOFF_HZ, DEFAULT_SENSITIVITY)
    }

    pub fn with_params(sample_rate: u32, cutoff_hz: f32, sensitivity: f32) -> Self {
        let dt = 1.0 / sample_rate.max(1) as f32;
        let rc = 1.0 / (2.0 * std::f32::consts::PI * cutoff_hz);
        Self {
            alpha: dt / (rc + dt),
            filtered: 0.0,
            sensitivity,
            history: VecDeque::with_capacity(HISTORY_BLOCKS),
        }
    }

    /// Feeds one block of mono samples.
    ///
    /// Returns a candidate when the block's low-band energy exceeds the
    /// running average by the sensitivity factor. No candidate is reported
    /// until the history is full.
    pub fn process(&mut self, samples: &[f32]) -> Option<BeatCandidate> {
        if samples.is_empty() {
            return None;
        }

        let mut sum_sq = 0.0f32;
        for &s in samples {
            self.filtered += self.alpha * (s - self.filtered);
            sum_sq += self.filtered * self.filtered;
        }
        let energy = (sum_sq / samples.len() as f32).sqrt();

        let warmed_up = self.history.len() == HISTORY_BLOCKS;
        let average = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<f32>() / self.history.len() as f32
        };

        if self.history.len() == HISTORY_BLOCKS {
            self.history.pop_front();
        }
        self.history.push_back(energy);

        if warmed_up && average > f32::EPSILON && energy > average * self.sensitivity {
            Some(BeatCandidate { energy, average })
        } else {
            None
        }
    }

    pub fn reset(&mut self) {
        self.filtered = 0.0;
        self.history.clear();
    }
}
