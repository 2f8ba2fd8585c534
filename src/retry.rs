//! Retry with exponential backoff for transient collaborator errors (spec §4.9).
//!
//! `DescribeServer`/`EnhanceTool`/`Embed` calls can fail on transient I/O or
//! timeout errors; those are retried before being treated as a hard indexing
//! failure. Protocol-level errors (bad JSON, tool not found) are not retried.

use backoff::future::retry;
use backoff::Error as BackoffError;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.base_delay_ms))
            .with_max_interval(Duration::from_millis(self.max_delay_ms))
            .with_multiplier(2.0)
            .with_randomization_factor(0.5)
            .with_max_elapsed_time(Some(Duration::from_millis(
                self.base_delay_ms * self.max_attempts as u64 * 4,
            )))
            .build()
    }
}

/// Transient errors (worth retrying): subprocess/network timeouts and IO
/// errors. Protocol errors, `NotFound`, `ToolError`, etc. are permanent.
fn is_transient(error: &EngineError) -> bool {
    matches!(error, EngineError::Timeout(..) | EngineError::IOError(_))
}

/// Retries `operation` under `config`'s backoff schedule, stopping early on
/// a non-transient error.
pub async fn retry_with_backoff<F, T, Fut>(
    operation: F,
    config: &RetryConfig,
) -> Result<T, EngineError>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, EngineError>> + Send,
{
    retry(config.backoff(), || async {
        match operation().await {
            Ok(value) => Ok(value),
            Err(error) if is_transient(&error) => Err(BackoffError::transient(error)),
            Err(error) => Err(BackoffError::permanent(error)),
        }
    })
    .await
    .map_err(|e| match e {
        BackoffError::Permanent(inner) => inner,
        BackoffError::Transient { err, .. } => err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_error_until_success() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 1,
            max_delay_ms: 10,
        };

        let result = retry_with_backoff(
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(EngineError::timeout("svc", 1))
                } else {
                    Ok(42)
                }
            },
            &config,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 1,
            max_delay_ms: 10,
        };

        let result: Result<(), EngineError> = retry_with_backoff(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::InvalidInput("bad schema".into()))
            },
            &config,
        )
        .await;

        assert!(matches!(result, Err(EngineError::InvalidInput(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
