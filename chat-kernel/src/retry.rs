//! Bounded retry with a per-attempt deadline.

use std::future::Future;
use std::time::Duration;

use chat_config::RetrySettings;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{Stage, Transient, TurnError, TurnResult};

/// Retry budget applied to every collaborator call in a turn.
///
/// Attempts are bounded by `max_attempts`; each one is cut off after
/// `call_timeout`. Only transient failures and timeouts are retried. The
/// delay grows geometrically from `initial_delay` up to `max_delay`, unless
/// the provider asked for a specific delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` below one is raised to one.
    #[must_use]
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        max_delay: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            multiplier: 2.0,
            call_timeout,
        }
    }

    /// Builds a policy from profile settings.
    #[must_use]
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.initial_delay(),
            settings.max_delay(),
            settings.call_timeout(),
        )
        .with_multiplier(settings.backoff_multiplier)
    }

    /// Sets the backoff growth factor. Values below one are treated as one.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = if multiplier.is_finite() { multiplier.max(1.0) } else { 1.0 };
        self
    }

    /// Total attempts per call.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Deadline for one attempt.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Backoff after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if scaled.is_finite() && scaled < self.max_delay.as_secs_f64() {
            Duration::from_secs_f64(scaled)
        } else {
            self.max_delay
        }
    }

    /// Runs `call` until it succeeds, fails permanently, or the budget is spent.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::Provider`] with the last collaborator error, or
    /// [`TurnError::Timeout`] if the last attempt hit the deadline.
    pub async fn run<T, E, F, Fut>(&self, stage: Stage, mut call: F) -> TurnResult<T>
    where
        E: Transient,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let (error, requested) = match timeout(self.call_timeout, call()).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        debug!(%stage, attempt, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Ok(Err(err)) => (TurnError::provider(stage, &err), err.retry_after()),
                Err(_) => (
                    TurnError::Timeout {
                        stage,
                        after: self.call_timeout,
                    },
                    None,
                ),
            };

            if !error.is_retryable() || attempt >= self.max_attempts {
                return Err(error);
            }

            let delay = requested.map_or_else(|| self.backoff(attempt), |d| d.min(self.max_delay));
            warn!(
                %stage,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying call"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chat_adapters::AdapterError;

    use super::*;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts,
            Duration::from_millis(1),
            Duration::from_millis(4),
            Duration::from_millis(50),
        )
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_millis(350),
            Duration::from_secs(1),
        );
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(30), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let value = fast(3)
            .run(Stage::Completion, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AdapterError::transport("connection reset"))
                } else {
                    Ok("done")
                }
            })
            .await
            .unwrap();
        assert_eq!(value, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_stop_immediately() {
        let calls = AtomicU32::new(0);
        let err = fast(5)
            .run(Stage::Completion, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AdapterError::Status {
                    provider: "OpenAI",
                    status: 401,
                    reason: "bad key".into(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, TurnError::Provider { retryable: false, .. }));
    }

    #[tokio::test]
    async fn budget_is_bounded() {
        let calls = AtomicU32::new(0);
        let err = fast(2)
            .run(Stage::Embedding, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AdapterError::RateLimited {
                    retry_after: Some(Duration::from_secs(60)),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(err.stage(), Some(Stage::Embedding));
    }

    #[tokio::test]
    async fn hung_calls_time_out() {
        let err = fast(2)
            .run(Stage::Recall, || async {
                sleep(Duration::from_secs(5)).await;
                Ok::<(), AdapterError>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TurnError::Timeout {
                stage: Stage::Recall,
                ..
            }
        ));
    }
}
