//! Semantic routing and zero-shot classification over a pluggable model
//! provider, plus the harness that measures both against labelled data.

pub mod classifier;
mod error;
pub mod evaluator;
#[cfg(feature = "onnx")]
pub mod onnx;
mod provider;
pub mod resilient;
pub mod router;
pub mod routes;
#[cfg(test)]
mod testing;

pub use classifier::{ClassifierAdapter, classify_binary};
pub use error::{EvalError, ProviderError, RouteError};
pub use evaluator::{CancelFlag, Decide, EvaluationReport, Evaluator, EvaluatorOptions};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxConfig, OnnxProvider};
pub use provider::{Capability, ClassificationResult, Embedding, Provider};
pub use resilient::{Resilient, RetryPolicy};
pub use router::{RouteMatch, Router};
pub use routes::{Route, RouteSpec, RouteStore};
