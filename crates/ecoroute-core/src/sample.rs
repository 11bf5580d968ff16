//! Labelled samples shared by the loader, the route seeding, and the evaluator.

use serde::{Deserialize, Serialize};

/// A single ground-truth record: a piece of text and whether it is environmental.
///
/// Created by the dataset loader and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub text: String,
    /// `true` for the positive ("environmental") class.
    pub label: bool,
}

impl Sample {
    pub fn new(text: impl Into<String>, label: bool) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Names given to the two classes of a binary task.
///
/// Maps ground truth onto the label strings a decision function produces, so
/// both the router (route names) and the zero-shot classifier (candidate
/// labels) can be scored the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryLabels {
    pub positive: String,
    pub negative: String,
}

impl BinaryLabels {
    pub fn new(positive: impl Into<String>, negative: impl Into<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.into(),
        }
    }

    /// Label string expected for a sample's ground truth.
    pub fn expected(&self, sample: &Sample) -> &str {
        if sample.label {
            &self.positive
        } else {
            &self.negative
        }
    }
}

/// Count positive and negative samples.
pub fn class_counts(samples: &[Sample]) -> (usize, usize) {
    let positive = samples.iter().filter(|s| s.label).count();
    (positive, samples.len() - positive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_label_follows_ground_truth() {
        let labels = BinaryLabels::new("environmental", "not environmental");
        assert_eq!(
            labels.expected(&Sample::new("river pollution", true)),
            "environmental"
        );
        assert_eq!(
            labels.expected(&Sample::new("quarterly earnings", false)),
            "not environmental"
        );
    }

    #[test]
    fn counts_both_classes() {
        let samples = vec![
            Sample::new("a", true),
            Sample::new("b", false),
            Sample::new("c", true),
        ];
        assert_eq!(class_counts(&samples), (2, 1));
        assert_eq!(class_counts(&[]), (0, 0));
    }

    #[test]
    fn sample_json_roundtrip() {
        let sample = Sample::new("Emissions rose by 4% \"year on year\"", true);
        let json = serde_json::to_string(&sample).unwrap();
        let parsed: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }
}
