//! Bounded retry with linear backoff around any fallible async operation.

use std::future::Future;
use std::time::Duration;

use log::{error, warn};

use crate::errors::{BrokerApiError, RetryClass};

/// Default attempt budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay between attempts; the wait grows linearly per attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Wraps an operation with bounded retry.
///
/// Only [`RetryClass::Transient`] failures are retried. Fatal credential
/// failures are re-raised immediately: a provider-wide credential outage
/// cannot be worked around by retrying an individual request, so the
/// process boundary is expected to terminate on them.
pub struct RetryController {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryController {
    pub fn new() -> Self {
        Self::with_policy(DEFAULT_MAX_RETRIES, DEFAULT_BASE_DELAY)
    }

    pub fn with_policy(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// Runs `operation` until it succeeds, fails unretryably, or the
    /// attempt budget is exhausted, in which case
    /// [`BrokerApiError::MaxRetriesExceeded`] carries the final failure.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T, BrokerApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BrokerApiError>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(failure) => match failure.retry_class() {
                    RetryClass::Fatal => {
                        error!("fatal failure, aborting: {failure}");
                        return Err(failure);
                    }
                    RetryClass::Never => return Err(failure),
                    RetryClass::Transient => {
                        if attempt >= self.max_retries {
                            error!("giving up after {attempt} attempts: {failure}");
                            return Err(BrokerApiError::MaxRetriesExceeded {
                                attempts: attempt,
                                source: Box::new(failure),
                            });
                        }
                        let wait = self.base_delay * attempt;
                        warn!(
                            "attempt {attempt}/{} failed ({failure}), retrying in {wait:?}",
                            self.max_retries
                        );
                        tokio::time::sleep(wait).await;
                    }
                },
            }
        }
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new()
    }
}
