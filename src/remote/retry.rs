use super::{RemoteError, RemoteResult};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded timeout plus exponential backoff for remote calls.
///
/// Each attempt runs on its own task. A timed-out attempt is not cancelled: it
/// keeps running to success or failure in the background and its result is
/// ignored, while the next attempt (or the escalation) proceeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32, backoff_base: Duration, backoff_max: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            backoff_base,
            backoff_max,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.request_timeout(),
            config.max_retries,
            config.retry_backoff_base(),
            config.retry_backoff_max(),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (zero based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    /// Run `call` until it succeeds, fails for a non-network reason, or the
    /// retry budget is spent. Exhaustion yields [`SyncError::Network`].
    pub async fn run<T, F, Fut>(&self, operation: &'static str, call: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.run_bounded(operation, self.max_retries, call).await
    }

    /// Single attempt under the timeout, for requests that must not be sent
    /// twice. A timed-out attempt may still land on the server.
    pub async fn run_once<T, F, Fut>(&self, operation: &'static str, call: F) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.run_bounded(operation, 0, call).await
    }

    async fn run_bounded<T, F, Fut>(
        &self,
        operation: &'static str,
        max_retries: u32,
        mut call: F,
    ) -> SyncResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut attempt = 0;
        loop {
            let handle = tokio::spawn(call());
            let failure = match tokio::time::timeout(self.timeout, handle).await {
                Ok(Ok(Ok(value))) => return Ok(value),
                Ok(Ok(Err(RemoteError::Network(message)))) => message,
                Ok(Ok(Err(other))) => return Err(other.into()),
                Ok(Err(join_error)) => format!("request task failed: {join_error}"),
                Err(_) => format!("timed out after {}ms", self.timeout.as_millis()),
            };

            if attempt >= max_retries {
                warn!(
                    operation = operation,
                    attempts = attempt + 1,
                    error = %failure,
                    "Remote call exhausted retries"
                );
                return Err(SyncError::network(operation, failure));
            }

            let delay = self.backoff_for(attempt);
            warn!(
                operation = operation,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Remote call failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
