//! Named routes, each holding example texts and their embeddings.
//!
//! The store is built once before evaluation and read-only afterwards.

use std::collections::HashSet;

use tracing::info;

use crate::error::{ProviderError, RouteError};
use crate::provider::{Capability, Embedding, Provider};

/// A named bucket of example embeddings, in insertion order.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    examples: Vec<(String, Embedding)>,
}

impl Route {
    /// Build a route from `(text, embedding)` pairs.
    ///
    /// Examples are keyed by text: a repeated text keeps its first position
    /// and embedding.
    pub fn new(name: impl Into<String>, examples: Vec<(String, Embedding)>) -> Self {
        let mut seen = HashSet::new();
        let examples = examples
            .into_iter()
            .filter(|(text, _)| seen.insert(text.clone()))
            .collect();
        Self {
            name: name.into(),
            examples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn examples(&self) -> &[(String, Embedding)] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}

/// Name and example texts of a route to be embedded.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub name: String,
    pub texts: Vec<String>,
}

impl RouteSpec {
    pub fn new(name: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            name: name.into(),
            texts,
        }
    }
}

/// Ordered, validated set of routes sharing one embedding dimension.
#[derive(Debug, Clone)]
pub struct RouteStore {
    routes: Vec<Route>,
    dim: usize,
}

impl RouteStore {
    /// Validate and wrap routes.
    ///
    /// Requires at least one route, distinct names, no empty route, and one
    /// embedding dimension across every example.
    pub fn new(routes: Vec<Route>) -> Result<Self, RouteError> {
        let first = routes.first().ok_or(RouteError::NoRoutes)?;
        let dim = first
            .examples
            .first()
            .map(|(_, e)| e.len())
            .ok_or_else(|| RouteError::EmptyRoute(first.name.clone()))?;

        let mut names = HashSet::new();
        for route in &routes {
            if !names.insert(route.name.as_str()) {
                return Err(RouteError::DuplicateRoute(route.name.clone()));
            }
            if route.is_empty() {
                return Err(RouteError::EmptyRoute(route.name.clone()));
            }
            if let Some((_, e)) = route.examples.iter().find(|(_, e)| e.len() != dim) {
                return Err(RouteError::DimensionMismatch {
                    expected: dim,
                    got: e.len(),
                });
            }
        }

        Ok(Self { routes, dim })
    }

    /// Embed each spec's texts with one batched provider call and build the store.
    ///
    /// The embedding model is prepared first, outside any per-call timeout.
    pub async fn seed<P>(provider: &P, specs: Vec<RouteSpec>) -> Result<Self, RouteError>
    where
        P: Provider + ?Sized,
    {
        if specs.is_empty() {
            return Err(RouteError::NoRoutes);
        }
        provider.ensure_ready(Capability::Embedding).await?;

        let mut routes = Vec::with_capacity(specs.len());
        for spec in specs {
            // Fail before spending a provider call on an unusable route.
            if spec.texts.is_empty() {
                return Err(RouteError::EmptyRoute(spec.name));
            }

            let mut seen = HashSet::new();
            let texts: Vec<String> = spec
                .texts
                .into_iter()
                .filter(|t| seen.insert(t.clone()))
                .collect();

            let embeddings = provider.embed(&texts).await?;
            if embeddings.len() != texts.len() {
                return Err(ProviderError::CountMismatch {
                    expected: texts.len(),
                    got: embeddings.len(),
                }
                .into());
            }

            info!(route = %spec.name, examples = texts.len(), "embedded route examples");
            routes.push(Route::new(spec.name, texts.into_iter().zip(embeddings).collect()));
        }

        Self::new(routes)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Embedding dimensionality shared by every example.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Total number of examples across routes.
    pub fn example_count(&self) -> usize {
        self.routes.iter().map(Route::len).sum()
    }

    /// `(route name, example count)` in route order.
    pub fn summary(&self) -> Vec<(&str, usize)> {
        self.routes.iter().map(|r| (r.name(), r.len())).collect()
    }
}
