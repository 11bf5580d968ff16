//! The embedding/classification capability consumed by routing and evaluation.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::ProviderError;

/// Dense, unit-length sentence embedding.
pub type Embedding = Vec<f32>;

/// Score per candidate label, each in `[0, 1]`.
pub type ClassificationResult = HashMap<String, f32>;

/// Which model a provider should prepare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Embedding,
    Classification,
}

/// Text embedding and zero-shot classification, injected into the router,
/// the classifier adapter, and the evaluator.
///
/// Implementations may load models lazily; [`ensure_ready`](Self::ensure_ready)
/// performs that setup exactly once and is safe to call repeatedly.
#[async_trait]
pub trait Provider: Send + Sync {
    /// One mean-pooled, L2-normalized vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError>;

    /// Score `text` against each label.
    ///
    /// With `multi_label = false` the labels compete for a single choice;
    /// with `true` each label is scored independently.
    async fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<ClassificationResult, ProviderError>;

    async fn ensure_ready(&self, _capability: Capability) -> Result<(), ProviderError> {
        Ok(())
    }
}
