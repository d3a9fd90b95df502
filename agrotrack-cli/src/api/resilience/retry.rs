//! Retry with exponential backoff for backend calls

use log::{debug, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::api::error::HttpStatusError;

/// Retry behaviour for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Randomize each delay between 50% and 100% of its nominal value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }
}

/// Classifies errors as worth retrying
pub trait RetryableError {
    /// Transient failure: timeout, connection failure, HTTP 429 or 5xx
    fn is_retryable(&self) -> bool;

    /// The request never reached the server, so resending cannot duplicate it
    fn is_unsent(&self) -> bool;
}

impl RetryableError for anyhow::Error {
    fn is_retryable(&self) -> bool {
        if let Some(status) = self.downcast_ref::<HttpStatusError>() {
            return status.is_transient();
        }
        if let Some(err) = self.downcast_ref::<reqwest::Error>() {
            return err.is_timeout() || err.is_connect();
        }
        false
    }

    fn is_unsent(&self) -> bool {
        self.downcast_ref::<reqwest::Error>()
            .map(reqwest::Error::is_connect)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Nominal delay before retry number `retry` (1-based), without jitter
    pub fn base_delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.config.base_delay.as_millis() as f64
            * self.config.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped.max(0.0) as u64)
    }

    fn delay_for(&self, retry: u32) -> Duration {
        let delay = self.base_delay_for(retry);
        if self.config.jitter && !delay.is_zero() {
            let factor: f64 = rand::rng().random_range(0.5..=1.0);
            delay.mul_f64(factor)
        } else {
            delay
        }
    }

    /// Run `f` until it succeeds, fails permanently, or attempts run out
    pub async fn execute<T, F, Fut>(&self, operation: &str, f: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.execute_if(operation, |e| e.is_retryable(), f).await
    }

    /// Like [`execute`](Self::execute), retrying only errors accepted by `should_retry`
    pub async fn execute_if<T, F, Fut, P>(
        &self,
        operation: &str,
        should_retry: P,
        mut f: F,
    ) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        P: Fn(&anyhow::Error) -> bool,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && should_retry(&e) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {:#}",
                        operation, attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
            jitter: false,
        })
    }

    fn transient() -> anyhow::Error {
        HttpStatusError {
            status: 503,
            body: "busy".to_string(),
        }
        .into()
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        });
        assert_eq!(policy.base_delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.base_delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.base_delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.base_delay_for(20), Duration::from_secs(30));
    }

    #[test]
    fn test_classification() {
        assert!(transient().is_retryable());
        let rate_limited: anyhow::Error = HttpStatusError {
            status: 429,
            body: String::new(),
        }
        .into();
        assert!(rate_limited.is_retryable());
        let bad_request: anyhow::Error = HttpStatusError {
            status: 400,
            body: String::new(),
        }
        .into();
        assert!(!bad_request.is_retryable());
        assert!(!anyhow::anyhow!("validation failed").is_retryable());
        // Context does not hide the status
        assert!(transient().context("inserting batch").is_retryable());
        // A gateway error means the request was delivered
        assert!(!transient().is_unsent());
        assert!(!anyhow::anyhow!("validation failed").is_unsent());
    }

    #[tokio::test]
    async fn test_execute_if_respects_predicate() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: anyhow::Result<()> = fast(5)
            .execute_if("test", |e| e.is_unsent(), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = fast(3)
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok(7)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: anyhow::Result<()> = fast(2)
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: anyhow::Result<()> = fast(5)
            .execute("test", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("invalid record")
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
