//! Greedy split of a shuffled dataset into per-class example sets and a test set.
//!
//! One left-to-right pass: a sample joins its class's example set while that
//! set is below quota, otherwise it falls through to the test set. Order is
//! preserved in every bucket.

use crate::sample::Sample;

/// Example quotas for the binary split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotas {
    pub positive: usize,
    pub negative: usize,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            positive: 20,
            negative: 80,
        }
    }
}

/// Result of a binary split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Texts of up to `quotas.positive` positive samples.
    pub positive: Vec<String>,
    /// Texts of up to `quotas.negative` negative samples.
    pub negative: Vec<String>,
    /// Every sample that did not become an example.
    pub test: Vec<Sample>,
}

/// Split samples into positive examples, negative examples, and a test set.
pub fn partition(samples: Vec<Sample>, quotas: Quotas) -> Partition {
    let (mut examples, test) = partition_by(
        samples,
        &[quotas.positive, quotas.negative],
        |s| if s.label { 0 } else { 1 },
    );

    let negative = examples.pop().unwrap_or_default();
    let positive = examples.pop().unwrap_or_default();

    Partition {
        positive: positive.into_iter().map(|s| s.text).collect(),
        negative: negative.into_iter().map(|s| s.text).collect(),
        test,
    }
}

/// K-class generalisation of [`partition`].
///
/// `class_of` maps a sample to an index into `quotas`; an index outside
/// `quotas` has no example set and always goes to the test set. Returns one
/// example bucket per quota plus the test set.
pub fn partition_by<F>(
    samples: Vec<Sample>,
    quotas: &[usize],
    class_of: F,
) -> (Vec<Vec<Sample>>, Vec<Sample>)
where
    F: Fn(&Sample) -> usize,
{
    let mut examples: Vec<Vec<Sample>> = quotas.iter().map(|&q| Vec::with_capacity(q)).collect();
    let mut test = Vec::new();

    for sample in samples {
        let class = class_of(&sample);
        match (examples.get_mut(class), quotas.get(class)) {
            (Some(bucket), Some(&quota)) if bucket.len() < quota => bucket.push(sample),
            _ => test.push(sample),
        }
    }

    (examples, test)
}
