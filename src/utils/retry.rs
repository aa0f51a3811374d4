// src/utils/retry.rs

//! Bounded exponential backoff for transient I/O failures.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Retry settings shared by listing, download and storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    /// Delay before the first retry
    pub min_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from the `[http]` configuration section.
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_delay: Duration::from_millis(config.backoff_min_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms.max(config.backoff_min_ms)),
        }
    }

    /// A policy with millisecond delays, for tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }

    /// Run `op`, retrying transient errors until the attempt cap is reached.
    ///
    /// Non-transient errors are returned unchanged after the first failure.
    /// Exhausted retries are wrapped in [`AppError::RetriesExhausted`] with the
    /// operation name and target.
    pub async fn run<T, F, Fut>(&self, operation: &str, target: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0usize;

        let result = (|| {
            attempts += 1;
            op()
        })
        .retry(self.backoff())
        .sleep(tokio::time::sleep)
        .when(AppError::is_transient)
        .notify(|err: &AppError, delay: Duration| {
            log::info!(
                "Retrying {} on {} in {:?}. Last error: {}",
                operation,
                target,
                delay,
                err
            );
        })
        .await;

        result.map_err(|err| {
            if err.is_transient() {
                AppError::RetriesExhausted {
                    operation: operation.to_string(),
                    target: target.to_string(),
                    attempts,
                    source: Box::new(err),
                }
            } else {
                err
            }
        })
    }
}
