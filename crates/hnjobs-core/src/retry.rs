//! Bounded retry with exponential backoff for transient fetch failures.

use std::time::Duration;

use crate::error::AppError;
use crate::traits::Fetcher;

/// Retry configuration with exponential backoff.
///
/// Delay schedule with the defaults: 1s, 2s, 4s, then give up.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `retry` (1-indexed): `base * 2^(retry-1)`,
    /// capped at `max_delay`.
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1 << exp);
        std::cmp::min(delay, self.max_delay)
    }
}

/// A [`Fetcher`] wrapper that retries errors for which
/// [`AppError::is_retryable`] holds.
///
/// Non-retryable errors (4xx, malformed JSON) are returned immediately.
/// When the retry budget is spent, the last transient error is surfaced
/// as [`AppError::RemoteUnavailable`].
#[derive(Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    policy: RetryPolicy,
}

impl<F: Fetcher> RetryingFetcher<F> {
    pub fn new(inner: F, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<F: Fetcher> Fetcher for RetryingFetcher<F> {
    async fn fetch(&self, url: &str) -> Result<serde_json::Value, AppError> {
        let mut retry = 0;
        loop {
            match self.inner.fetch(url).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if retry >= self.policy.max_retries => {
                    return Err(AppError::RemoteUnavailable {
                        url: url.to_string(),
                        attempts: retry + 1,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    retry += 1;
                    let delay = self.policy.delay_for_retry(retry);
                    tracing::warn!(
                        %url,
                        error = %e,
                        retry,
                        delay_ms = %delay.as_millis(),
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
