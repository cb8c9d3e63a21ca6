//! Judgments, running score and grading.
//!
//! This module defines the judgment categories and the score state mutated by
//! the judgment engine, including accuracy and grade computation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Judgment categories from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Judgment {
    Perfect,
    Great,
    Good,
    Miss,
}

impl Judgment {
    pub fn is_miss(self) -> bool {
        self == Judgment::Miss
    }
}

impl fmt::Display for Judgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Judgment::Perfect => "PERFECT",
            Judgment::Great => "GREAT",
            Judgment::Good => "GOOD",
            Judgment::Miss => "MISS",
        };
        f.write_str(name)
    }
}

/// Per-judgment counters.
///
/// `hold` counts successful hold completions; it does not enter accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentCounts {
    pub perfect: u32,
    pub great: u32,
    pub good: u32,
    pub miss: u32,
    pub hold: u32,
}

impl JudgmentCounts {
    /// Number of judgments that count toward accuracy.
    pub fn total_judged(&self) -> u32 {
        self.perfect + self.great + self.good + self.miss
    }
}

/// Letter grade computed at session end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

impl Grade {
    /// Maps an accuracy ratio (0.0 - 1.0) to a grade.
    ///
    /// A session with nothing judged has no accuracy and grades D.
    pub fn from_accuracy(accuracy: Option<f64>) -> Self {
        match accuracy {
            Some(a) if a >= 0.95 => Grade::S,
            Some(a) if a >= 0.90 => Grade::A,
            Some(a) if a >= 0.80 => Grade::B,
            Some(a) if a >= 0.70 => Grade::C,
            _ => Grade::D,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        };
        f.write_str(name)
    }
}

/// Accumulated score for a play session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreState {
    pub total_score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub counts: JudgmentCounts,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tap or hold-start judgment worth `points`.
    pub fn record_judgment(&mut self, judgment: Judgment, points: u32) {
        match judgment {
            Judgment::Perfect => self.counts.perfect += 1,
            Judgment::Great => self.counts.great += 1,
            Judgment::Good => self.counts.good += 1,
            Judgment::Miss => self.counts.miss += 1,
        }
        self.apply_combo(judgment);
        self.total_score += points as u64;
    }

    /// Records the final judgment of a hold plus its completion bonus.
    pub fn record_hold_completion(&mut self, judgment: Judgment, bonus: u32) {
        if judgment.is_miss() {
            self.counts.miss += 1;
        } else {
            self.counts.hold += 1;
        }
        self.apply_combo(judgment);
        self.total_score += bonus as u64;
    }

    /// Adds progressive hold score. Never touches combo.
    pub fn add_hold_progress(&mut self, points: u32) {
        self.total_score += points as u64;
    }

    fn apply_combo(&mut self, judgment: Judgment) {
        if judgment.is_miss() {
            self.combo = 0;
        } else {
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
        }
    }

    /// Weighted accuracy (0.0 - 1.0), `None` when nothing has been judged.
    ///
    /// - Perfect: 100% weight
    /// - Great: 80% weight
    /// - Good: 50% weight
    /// - Miss: 0% weight
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.counts.total_judged();
        if total == 0 {
            return None;
        }
        let weighted = self.counts.perfect as f64
            + self.counts.great as f64 * 0.8
            + self.counts.good as f64 * 0.5;
        Some(weighted / total as f64)
    }

    pub fn grade(&self) -> Grade {
        Grade::from_accuracy(self.accuracy())
    }
}
