//! Accuracy and latency of a decision function against ground truth.
//!
//! The decider is warmed up once before the clock starts, so model loading
//! never counts towards elapsed time. Samples are then decided in input order,
//! optionally with several provider calls in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ecoroute_core::{Accuracy, BinaryLabels, EvaluationStats, Sample};
use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

use crate::classifier::ClassifierAdapter;
use crate::error::EvalError;
use crate::provider::{Capability, Provider};
use crate::router::Router;

/// Text used to force the zero-shot model to load.
pub const CLASSIFY_WARM_UP_TEXT: &str = "Foobar";
/// Text used to force the embedding model to load.
pub const EMBED_WARM_UP_TEXT: &str = "preload";

/// A strategy that maps a text onto one of two label strings.
#[async_trait]
pub trait Decide: Send + Sync {
    /// Prepare models and run one throwaway call so the first timed decision
    /// pays no setup cost.
    async fn warm_up(&self) -> Result<(), EvalError>;

    async fn decide(&self, text: &str) -> Result<String, EvalError>;
}

#[async_trait]
impl<'a, P: Provider + ?Sized> Decide for Router<'a, P> {
    async fn warm_up(&self) -> Result<(), EvalError> {
        self.provider().ensure_ready(Capability::Embedding).await?;
        self.provider()
            .embed(&[EMBED_WARM_UP_TEXT.to_string()])
            .await?;
        Ok(())
    }

    async fn decide(&self, text: &str) -> Result<String, EvalError> {
        Ok(self.route(text).await?.route)
    }
}

#[async_trait]
impl<'a, P: Provider + ?Sized> Decide for ClassifierAdapter<'a, P> {
    async fn warm_up(&self) -> Result<(), EvalError> {
        self.provider()
            .ensure_ready(Capability::Classification)
            .await?;
        let labels = [
            self.labels().positive.clone(),
            self.labels().negative.clone(),
        ];
        self.provider()
            .classify(CLASSIFY_WARM_UP_TEXT, &labels, true)
            .await?;
        Ok(())
    }

    async fn decide(&self, text: &str) -> Result<String, EvalError> {
        Ok(self.classify(text).await?)
    }
}

/// Shared stop signal, checked between samples.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    /// Provider calls in flight at once. `1` is strictly sequential.
    pub concurrency: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Outcome of one evaluation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub stats: EvaluationStats,
    /// Wall time of the timed phase, warm-up excluded.
    pub elapsed: Duration,
    /// `true` when the run stopped early; `stats` then covers a prefix.
    pub cancelled: bool,
}

impl EvaluationReport {
    pub fn accuracy(&self) -> Accuracy {
        self.stats.accuracy_percent()
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

pub struct Evaluator {
    options: EvaluatorOptions,
    cancel: CancelFlag,
}

impl Evaluator {
    pub fn new(options: EvaluatorOptions) -> Self {
        Self {
            options,
            cancel: CancelFlag::new(),
        }
    }

    /// Share an existing flag, e.g. one tripped by a signal handler.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Decide every sample and tally predictions against `labels`.
    ///
    /// The first provider error aborts the run.
    pub async fn evaluate<D>(
        &self,
        samples: &[Sample],
        labels: &BinaryLabels,
        decider: &D,
    ) -> Result<EvaluationReport, EvalError>
    where
        D: Decide + ?Sized,
    {
        decider.warm_up().await?;

        let window = self.options.concurrency.max(1);
        info!(samples = samples.len(), window, "evaluating");

        let start = Instant::now();
        let mut stats = EvaluationStats::default();
        let mut cancelled = false;

        let mut decisions = stream::iter(samples)
            .map(|sample| async move {
                decider
                    .decide(&sample.text)
                    .await
                    .map(|predicted| (sample, predicted))
            })
            .buffered(window);

        loop {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let Some(decision) = decisions.next().await else {
                break;
            };
            let (sample, predicted) = decision?;
            let expected = labels.expected(sample);
            debug!(%predicted, expected, "decided");
            stats.record(predicted == expected);
        }

        let elapsed = start.elapsed();
        if cancelled {
            warn!(evaluated = stats.total(), total = samples.len(), "evaluation cancelled");
        }
        info!(
            correct = stats.correct,
            incorrect = stats.incorrect,
            elapsed_ms = elapsed.as_millis() as u64,
            "evaluation finished"
        );

        Ok(EvaluationReport {
            stats,
            elapsed,
            cancelled,
        })
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(EvaluatorOptions::default())
    }
}
