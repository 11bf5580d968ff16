//! Correct/incorrect counters and derived accuracy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Running tally for an evaluation pass. Counters only ever increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationStats {
    pub correct: u64,
    pub incorrect: u64,
}

impl EvaluationStats {
    /// Record one decision.
    pub fn record(&mut self, is_correct: bool) {
        if is_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }

    /// Fraction correct in `[0, 1]`, or `None` when nothing was recorded.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some(self.correct as f64 / total as f64)
        }
    }

    /// Percentage correct rounded to two decimals.
    pub fn accuracy_percent(&self) -> Accuracy {
        match self.accuracy() {
            Some(a) => Accuracy::Percent((a * 10_000.0).round() / 100.0),
            None => Accuracy::NoData,
        }
    }
}

/// Accuracy as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    /// Percentage in `[0, 100]`, two decimals.
    Percent(f64),
    /// Nothing was evaluated.
    NoData,
}

impl Accuracy {
    pub fn percent(&self) -> Option<f64> {
        match self {
            Self::Percent(p) => Some(*p),
            Self::NoData => None,
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(p) => write!(f, "{p:.2} %"),
            Self::NoData => f.write_str("no data"),
        }
    }
}
