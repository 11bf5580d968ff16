//! Binary forced-choice wrapper around zero-shot classification.
//!
//! The provider scores both candidate labels with `multi_label = false` and
//! the label with the strictly greater score is predicted. Equal scores
//! resolve to the first-listed label.

use ecoroute_core::BinaryLabels;

use crate::error::ProviderError;
use crate::provider::{ClassificationResult, Provider};

/// Pick the higher-scoring of two labels; `first` wins ties.
pub fn pick_label<'l>(
    scores: &ClassificationResult,
    first: &'l str,
    second: &'l str,
) -> Result<&'l str, ProviderError> {
    let score_of = |label: &str| {
        scores
            .get(label)
            .copied()
            .ok_or_else(|| ProviderError::MissingLabel(label.to_string()))
    };
    let a = score_of(first)?;
    let b = score_of(second)?;

    Ok(if b > a { second } else { first })
}

/// Classify `text` as one of two labels.
pub async fn classify_binary<P>(
    provider: &P,
    text: &str,
    label_a: &str,
    label_b: &str,
) -> Result<String, ProviderError>
where
    P: Provider + ?Sized,
{
    let labels = [label_a.to_string(), label_b.to_string()];
    let scores = provider.classify(text, &labels, false).await?;
    pick_label(&scores, label_a, label_b).map(str::to_string)
}

/// Zero-shot classifier bound to a provider and a positive/negative label pair.
pub struct ClassifierAdapter<'a, P: ?Sized> {
    provider: &'a P,
    labels: BinaryLabels,
}

impl<'a, P: Provider + ?Sized> ClassifierAdapter<'a, P> {
    /// `labels.positive` is listed first and therefore wins ties.
    pub fn new(provider: &'a P, labels: BinaryLabels) -> Self {
        Self { provider, labels }
    }

    pub fn labels(&self) -> &BinaryLabels {
        &self.labels
    }

    pub fn provider(&self) -> &P {
        self.provider
    }

    pub async fn classify(&self, text: &str) -> Result<String, ProviderError> {
        classify_binary(
            self.provider,
            text,
            &self.labels.positive,
            &self.labels.negative,
        )
        .await
    }
}
