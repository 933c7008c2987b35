//! Retry utilities with exponential backoff for resilient API calls.

use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Backoff delay before attempt `attempt + 1`, capped by `max_delay`
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        let secs = self.initial_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, PartialEq)]
pub enum TransientError {
    /// Rate limit exceeded, with the server-suggested wait if any
    RateLimit(Option<Duration>),
    /// Network connectivity issues
    Network,
}

impl TransientError {
    /// Check if a SourceError represents a transient error
    ///
    /// Blocked and empty responses are left to the caller: retrying them
    /// immediately from the same address does not help.
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::RateLimit { retry_after } => Some(TransientError::RateLimit(*retry_after)),
            SourceError::Network(_) => Some(TransientError::Network),
            _ => None,
        }
    }

    /// Server-suggested delay, if the error carried one
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TransientError::RateLimit(retry_after) => *retry_after,
            TransientError::Network => None,
        }
    }
}

/// Execute an async operation with retry logic
///
/// Transient failures are retried with exponential backoff; a server-provided
/// retry-after wins when it is longer than the computed delay. Permanent
/// errors and the last transient error are returned unchanged.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_source_error(&error) else {
                    return Err(error);
                };

                if attempts >= config.max_attempts {
                    tracing::warn!("Operation failed after {} attempts: {}", attempts, error);
                    return Err(error);
                }

                let delay = config.backoff(attempts);
                let delay = transient.retry_after().map_or(delay, |after| after.max(delay));

                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );

                sleep(delay).await;
            }
        }
    }
}

/// Retry configuration for APIs with strict rate limits
pub fn strict_rate_limit_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(120),
        backoff_multiplier: 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn fast_config(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(3), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Ok("success")
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_retry_success_after_rate_limit() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(fast_config(4), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    if *call_count.borrow() < 3 {
                        Err(SourceError::RateLimit {
                            retry_after: Some(Duration::from_millis(1)),
                        })
                    } else {
                        Ok("success")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<(), SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(2), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::RateLimit { retry_after: None })
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::RateLimit { .. })));
        assert_eq!(*call_count.borrow(), 2);
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<&str, SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(5), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::Api("bad request".to_string()))
                }
            })
        }
        .await;

        assert!(matches!(result, Err(SourceError::Api(_))));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn test_transient_error_detection() {
        let rate_limit = SourceError::RateLimit {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(
            TransientError::from_source_error(&rate_limit),
            Some(TransientError::RateLimit(Some(Duration::from_secs(30))))
        );

        let network_error = SourceError::Network("connection refused".to_string());
        assert_eq!(
            TransientError::from_source_error(&network_error),
            Some(TransientError::Network)
        );

        assert!(TransientError::from_source_error(&SourceError::Parse("json".to_string())).is_none());
        assert!(TransientError::from_source_error(&SourceError::EmptyResponse).is_none());
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        };

        assert_eq!(config.backoff(1), Duration::from_secs(1));
        assert_eq!(config.backoff(2), Duration::from_secs(2));
        assert_eq!(config.backoff(3), Duration::from_secs(4));
        assert_eq!(config.backoff(4), Duration::from_secs(5));
    }
}
