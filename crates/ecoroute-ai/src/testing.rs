//! Scripted in-memory provider for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::provider::{Capability, ClassificationResult, Embedding, Provider};

/// Returns canned embeddings and scores, and records how it was called.
#[derive(Default)]
pub struct StubProvider {
    embeddings: HashMap<String, Embedding>,
    scores: HashMap<String, ClassificationResult>,
    /// Used for texts with no canned embedding.
    fallback: Option<Embedding>,
    /// Vectors added to (or removed from) every embed response.
    count_skew: isize,
    pub embed_calls: AtomicUsize,
    pub classify_calls: AtomicUsize,
    pub ready_calls: Mutex<Vec<Capability>>,
    pub multi_label_flags: Mutex<Vec<bool>>,
    pub embedded_texts: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, text: &str, embedding: &[f32]) -> Self {
        self.embeddings.insert(text.to_string(), embedding.to_vec());
        self
    }

    pub fn with_fallback(mut self, embedding: &[f32]) -> Self {
        self.fallback = Some(embedding.to_vec());
        self
    }

    /// Return `skew` more vectors than texts, or fewer when negative.
    pub fn with_count_skew(mut self, skew: isize) -> Self {
        self.count_skew = skew;
        self
    }

    pub fn with_scores(mut self, text: &str, scores: &[(&str, f32)]) -> Self {
        self.scores.insert(
            text.to_string(),
            scores.iter().map(|(l, s)| (l.to_string(), *s)).collect(),
        );
        self
    }

    pub fn embed_count(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        self.embed_calls.fetch_add(1, Ordering::SeqCst);
        self.embedded_texts
            .lock()
            .unwrap()
            .extend(texts.iter().cloned());
        let mut vectors = texts
            .iter()
            .map(|t| {
                self.embeddings
                    .get(t)
                    .or(self.fallback.as_ref())
                    .cloned()
                    .ok_or_else(|| ProviderError::Inference(format!("no embedding for {t:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if self.count_skew < 0 {
            vectors.truncate(vectors.len().saturating_sub(self.count_skew.unsigned_abs()));
        } else if let Some(last) = vectors.last().cloned() {
            vectors.extend(std::iter::repeat_n(last, self.count_skew as usize));
        }
        Ok(vectors)
    }

    async fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<ClassificationResult, ProviderError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        self.multi_label_flags.lock().unwrap().push(multi_label);
        match self.scores.get(text) {
            Some(scores) => Ok(scores.clone()),
            None => Ok(labels.iter().map(|l| (l.clone(), 0.5)).collect()),
        }
    }

    async fn ensure_ready(&self, capability: Capability) -> Result<(), ProviderError> {
        self.ready_calls.lock().unwrap().push(capability);
        Ok(())
    }
}
