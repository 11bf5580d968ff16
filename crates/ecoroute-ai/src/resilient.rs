//! Per-call timeouts and retry with exponential backoff around a [`Provider`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::{Capability, ClassificationResult, Embedding, Provider};

/// How often and how patiently a failed provider call is repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; `1` disables retries.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(200))
    }
}

impl RetryPolicy {
    /// A single attempt.
    pub fn none() -> Self {
        Self::exponential(1, Duration::ZERO)
    }

    /// Delay doubles after every failed attempt, capped at 30 s.
    pub fn exponential(max_attempts: usize, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as usize) as i32;
        let millis = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exp);
        Duration::from_millis(millis.min(self.max_delay.as_millis() as f64) as u64)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn retry<F, Fut, T>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "provider call succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    warn!(attempts = attempt, error = %e, "provider call failed, giving up");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Wraps a provider with an optional per-call timeout and a retry policy.
///
/// Model preparation ([`Provider::ensure_ready`]) is passed through untouched:
/// it is neither timed out nor retried.
pub struct Resilient<P> {
    inner: P,
    timeout: Option<Duration>,
    policy: RetryPolicy,
}

impl<P: Provider> Resilient<P> {
    pub fn new(inner: P, timeout: Option<Duration>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            timeout,
            policy,
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    async fn call<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let timeout = self.timeout;
        self.policy
            .retry(|| {
                let fut = op();
                async move {
                    match timeout {
                        Some(limit) => match tokio::time::timeout(limit, fut).await {
                            Ok(result) => result,
                            Err(_) => Err(ProviderError::Timeout(limit)),
                        },
                        None => fut.await,
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl<P: Provider> Provider for Resilient<P> {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        self.call(|| self.inner.embed(texts)).await
    }

    async fn classify(
        &self,
        text: &str,
        labels: &[String],
        multi_label: bool,
    ) -> Result<ClassificationResult, ProviderError> {
        self.call(|| self.inner.classify(text, labels, multi_label))
            .await
    }

    async fn ensure_ready(&self, capability: Capability) -> Result<(), ProviderError> {
        self.inner.ensure_ready(capability).await
    }
}
