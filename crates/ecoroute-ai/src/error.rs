use std::time::Duration;

use thiserror::Error;

/// Failure of the embedding/classification capability.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("model load failed: {0}")]
    Load(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider returned {got} results for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("classification result has no score for label '{0}'")]
    MissingLabel(String),
}

impl ProviderError {
    /// Whether repeating the same call can reasonably succeed.
    ///
    /// Load failures and malformed results are permanent for the run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Inference(_))
    }
}

/// Failure to build a route store or to route an input.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route store has no routes")]
    NoRoutes,

    #[error("route '{0}' has no examples")]
    EmptyRoute(String),

    #[error("duplicate route name '{0}'")]
    DuplicateRoute(String),

    #[error("embedding dimension {got} does not match route store dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("no example produced a comparable similarity score")]
    NoMatch,

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failure of an evaluation run.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Route(#[from] RouteError),
}
