//! Retry-on-conflict policy.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Retry settings shared by every use case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::ZERO,
        }
    }
}

/// Re-runs an operation that lost an optimistic-concurrency race.
///
/// The wrapped closure is invoked once per attempt and must start from
/// scratch each time: open a new unit of work, re-read the rows, and
/// re-apply the change. Only errors of kind
/// [`ConcurrentModification`](crate::ErrorKind::ConcurrentModification)
/// are retried; anything else is returned as is.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns a copy of this policy with a different attempt budget.
    pub fn with_max_attempts(&self, max_attempts: u32) -> Self {
        Self {
            config: RetryConfig {
                max_attempts,
                ..self.config.clone()
            },
        }
    }

    /// Runs `attempt` until it succeeds, fails with a non-conflict error,
    /// or the attempt budget is spent. The last conflict is returned on
    /// exhaustion.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut tries = 1;
        loop {
            match attempt().await {
                Err(err) if err.is_conflict() => {
                    if tries >= max_attempts {
                        tracing::error!(
                            operation,
                            attempts = tries,
                            error = %err,
                            "giving up after repeated concurrent modifications"
                        );
                        metrics::counter!("optimistic_lock_exhausted_total", "operation" => operation)
                            .increment(1);
                        return Err(err);
                    }
                    tracing::warn!(
                        operation,
                        attempt = tries,
                        max_attempts,
                        error = %err,
                        "concurrent modification detected, retrying"
                    );
                    metrics::counter!("optimistic_lock_retries_total", "operation" => operation)
                        .increment(1);
                    if !self.config.backoff.is_zero() {
                        tokio::time::sleep(self.config.backoff).await;
                    }
                    tries += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use common::Version;
    use domain::DomainError;
    use store::StoreError;

    use super::*;
    use crate::error::AppError;

    fn conflict() -> AppError {
        AppError::Store(StoreError::ConcurrencyConflict {
            entity: "product",
            id: 1,
            expected: Version::first(),
            actual: Version::new(2),
        })
    }

    #[tokio::test]
    async fn test_succeeds_after_conflicts() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = policy
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(conflict())
                } else {
                    Ok(42)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_conflict() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            })
            .await;

        assert!(result.unwrap_err().is_conflict());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::Domain(DomainError::EmptyCart))
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            AppError::Domain(DomainError::EmptyCart)
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_per_call_override() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::default().with_max_attempts(5);
        assert_eq!(policy.config().max_attempts, 5);

        let _: Result<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 0,
            backoff: Duration::ZERO,
        });

        let _: Result<()> = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(conflict())
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
