//! Bounded retry loop for provider calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;
use wizard_adapters::{AdapterError, AdapterResult};
use wizard_config::RetryConfig;

/// Fixed-delay retry budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` attempts after the first.
    #[must_use]
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Attempts after the first one.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts, including the first.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `op` receives the zero-based attempt number. Only errors for which
    /// [`AdapterError::is_transient`] holds are retried.
    ///
    /// # Errors
    ///
    /// Returns the last error observed.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> AdapterResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AdapterResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    warn!(operation, attempt, error = %err, "provider call failed; retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, config.delay())
    }
}

/// Turns an empty parse into a retryable failure.
pub(crate) fn require_lines(lines: Vec<String>) -> AdapterResult<Vec<String>> {
    if lines.is_empty() {
        return Err(AdapterError::response("provider returned no usable lines"));
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_with_fixed_delay() {
        let policy = RetryPolicy::new(2, Duration::from_secs(1));
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result: AdapterResult<()> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AdapterError::transport("reset")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), policy.attempts());
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: AdapterResult<()> = policy
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AdapterError::configuration("no key")) }
            })
            .await;

        assert!(matches!(result, Err(AdapterError::Configuration { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_later_attempt() {
        let policy = RetryPolicy::default();
        let value = policy
            .run("test", |attempt| async move {
                if attempt < 1 {
                    require_lines(Vec::new())
                } else {
                    require_lines(vec!["ok".to_owned()])
                }
            })
            .await
            .unwrap();
        assert_eq!(value, vec!["ok"]);
    }
}
