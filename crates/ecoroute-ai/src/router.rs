//! Winner-take-all nearest-neighbour routing.
//!
//! An input is embedded once and compared with every example of every route.
//! The route owning the single most similar example wins. Routes are scanned
//! in insertion order, then examples in insertion order, and only a strictly
//! greater score replaces the current best, so the first example reaching the
//! maximum decides ties.
//!
//! The scan is linear in the total number of examples, which is fine for a
//! few dozen examples per route. Larger stores would want an index.

use crate::error::{ProviderError, RouteError};
use crate::provider::Provider;
use crate::routes::RouteStore;

/// Winning route for an input and the similarity of its best example.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub route: String,
    pub score: f32,
}

/// Cosine similarity of two unit-length vectors, i.e. their dot product.
pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Find the route whose closest example is most similar to `embedding`.
pub fn best_match<'s>(
    store: &'s RouteStore,
    embedding: &[f32],
) -> Result<(&'s str, f32), RouteError> {
    if embedding.len() != store.dim() {
        return Err(RouteError::DimensionMismatch {
            expected: store.dim(),
            got: embedding.len(),
        });
    }

    let mut best: Option<(&str, f32)> = None;
    let mut best_score = f32::NEG_INFINITY;

    for route in store.routes() {
        for (_, example) in route.examples() {
            let score = similarity(embedding, example);
            if score > best_score {
                best_score = score;
                best = Some((route.name(), score));
            }
        }
    }

    best.ok_or(RouteError::NoMatch)
}

/// Routes texts against a read-only [`RouteStore`] using an injected provider.
pub struct Router<'a, P: ?Sized> {
    store: &'a RouteStore,
    provider: &'a P,
}

impl<'a, P: Provider + ?Sized> Router<'a, P> {
    pub fn new(store: &'a RouteStore, provider: &'a P) -> Self {
        Self { store, provider }
    }

    pub fn provider(&self) -> &P {
        self.provider
    }

    /// Embed `text` (one provider call) and pick the best route.
    pub async fn route(&self, text: &str) -> Result<RouteMatch, RouteError> {
        let mut embeddings = self.provider.embed(&[text.to_string()]).await?;
        if embeddings.len() != 1 {
            return Err(ProviderError::CountMismatch {
                expected: 1,
                got: embeddings.len(),
            }
            .into());
        }
        let embedding = embeddings.swap_remove(0);

        let (route, score) = best_match(self.store, &embedding)?;
        Ok(RouteMatch {
            route: route.to_string(),
            score,
        })
    }
}
