//! # External Call Policy
//!
//! Every call to an external capability (entity recognition, generation, embedding,
//! web search) goes through a [`CallPolicy`]. The policy bounds in-flight calls with
//! a shared semaphore, applies a per-attempt timeout, and retries transient failures
//! with exponential backoff when asked to.

use crate::{errors::ProviderError, settings::PipelineSettings};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct CallPolicy {
    limiter: Arc<Semaphore>,
    timeout: Duration,
    max_attempts: u32,
    backoff_base: Duration,
}

impl CallPolicy {
    pub fn new(
        max_concurrency: usize,
        timeout: Duration,
        max_attempts: u32,
        backoff_base: Duration,
    ) -> Self {
        Self {
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
            timeout,
            max_attempts: max_attempts.max(1),
            backoff_base,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(
            settings.max_concurrency,
            settings.call_timeout(),
            settings.max_attempts,
            settings.backoff_base(),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs a single attempt under the concurrency limit and the call timeout.
    pub async fn once<T, Fut>(&self, operation: &str, call: Fut) -> Result<T, ProviderError>
    where
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| ProviderError::MissingConfig("call limiter is closed".to_string()))?;

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation: operation.to_string(),
                elapsed: self.timeout,
            }),
        }
    }

    /// Runs `make_call` until it succeeds, fails permanently, or runs out of attempts.
    ///
    /// The permit is released between attempts so a backing-off call does not
    /// hold capacity other workflows could use.
    pub async fn retrying<T, F, Fut>(
        &self,
        operation: &str,
        mut make_call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 1;
        loop {
            match self.once(operation, make_call()).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        "{operation} failed on attempt {attempt}/{}: {e}. Retrying in {delay:?}.",
                        self.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!("{operation} giving up after {attempt} attempt(s): {e}");
                    return Err(e);
                }
            }
        }
    }

    /// Delay after the given failed attempt: `base * 2^(attempt - 1)`, exponent capped at 5.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5);
        self.backoff_base * (1u32 << exponent)
    }
}
