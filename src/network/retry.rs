//! Retry logic with exponential backoff

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use super::ExchangeError;
use crate::config::CollectorSettings;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            exponential_base: 2.0,
        }
    }
}

/// `max_retries` counts retries after the first attempt.
impl From<&CollectorSettings> for RetryConfig {
    fn from(settings: &CollectorSettings) -> Self {
        Self {
            max_attempts: settings.max_retries.saturating_add(1),
            initial_delay_ms: settings.initial_backoff_ms,
            max_delay_ms: settings.max_backoff_ms,
            exponential_base: 2.0,
        }
    }
}

/// Outcome of a retried operation that exhausted or aborted.
#[derive(Debug)]
pub struct RetryFailure {
    pub error: ExchangeError,
    pub attempts: u32,
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts. Each attempt is bounded by `timeout`.
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    config: &RetryConfig,
    timeout: Duration,
    context: &str,
) -> Result<T, RetryFailure>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ExchangeError>>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay_ms;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(ExchangeError::Timeout(timeout)),
        };

        match outcome {
            Ok(result) => return Ok(result),
            Err(error) if !error.is_retryable() || attempt >= config.max_attempts.max(1) => {
                return Err(RetryFailure { error, attempts: attempt });
            }
            Err(error) => {
                let wait = match &error {
                    ExchangeError::RateLimited { retry_after: Some(after) } => {
                        (*after).max(Duration::from_millis(delay))
                    }
                    _ => Duration::from_millis(delay),
                };

                warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt,
                    config.max_attempts,
                    context,
                    error,
                    wait.as_millis()
                );

                tokio::time::sleep(wait).await;

                delay = (delay as f64 * config.exponential_base) as u64;
                delay = delay.min(config.max_delay_ms);
                let jitter = delay as f64 * 0.1 * (rand::random::<f64>() - 0.5);
                delay = (delay as f64 + jitter).max(0.0) as u64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            exponential_base: 2.0,
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = &AtomicU32::new(0);
        let result = retry_with_backoff(
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ExchangeError::Unavailable("503".into()))
                } else {
                    Ok(7)
                }
            },
            &fast(),
            Duration::from_secs(1),
            "test",
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_fatal_errors() {
        let calls = &AtomicU32::new(0);
        let failure = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ExchangeError::Auth("invalid key".into()))
            },
            &fast(),
            Duration::from_secs(1),
            "test",
        )
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 1);
        assert!(failure.error.is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let failure = retry_with_backoff(
            || async { Err::<(), _>(ExchangeError::Http("connection reset".into())) },
            &fast(),
            Duration::from_secs(1),
            "test",
        )
        .await
        .unwrap_err();

        assert_eq!(failure.attempts, 3);
    }

    #[tokio::test]
    async fn configured_retries_follow_the_first_attempt() {
        let mut settings = crate::config::Config::default().collector;
        settings.max_retries = 3;
        settings.initial_backoff_ms = 1;
        settings.max_backoff_ms = 2;
        let config = RetryConfig::from(&settings);
        assert_eq!(config.max_attempts, 4);

        let calls = &AtomicU32::new(0);
        let failure = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ExchangeError::Unavailable("503".into()))
            },
            &config,
            Duration::from_secs(1),
            "test",
        )
        .await
        .unwrap_err();
        assert_eq!(failure.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        settings.max_retries = 0;
        assert_eq!(RetryConfig::from(&settings).max_attempts, 1);
    }

    #[tokio::test]
    async fn slow_attempts_time_out() {
        let failure = retry_with_backoff(
            || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, ExchangeError>(())
            },
            &RetryConfig { max_attempts: 1, ..fast() },
            Duration::from_millis(10),
            "test",
        )
        .await
        .unwrap_err();

        assert!(matches!(failure.error, ExchangeError::Timeout(_)));
    }
}
