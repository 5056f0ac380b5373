//! Rate-limit retry policy for model calls.
//!
//! A rate-limited call waits a fixed delay and is retried as-is. There is no
//! exponential growth and no jitter; the retry count is unbounded unless a cap
//! is configured.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::llm::LlmError;

/// Suspends the current task. Injected so tests never really sleep.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Fixed-delay retry for rate-limited calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before each retry
    pub delay: Duration,
    /// Maximum number of retries (None = retry forever)
    pub max_retries: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(60),
            max_retries: None,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            max_retries: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Whether another retry is allowed after `retries` retries.
    pub fn should_retry(&self, retries: u32) -> bool {
        self.max_retries.map_or(true, |max| retries < max)
    }

    /// Run `operation`, retrying only while it reports a rate limit.
    pub async fn run<F, Fut, T>(
        &self,
        sleeper: &dyn Sleeper,
        mut operation: F,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut retries = 0u32;
        loop {
            match operation().await {
                Ok(value) => {
                    if retries > 0 {
                        debug!("Model call succeeded after {} rate-limit retries", retries);
                    }
                    return Ok(value);
                }
                Err(err) if err.is_rate_limited() && self.should_retry(retries) => {
                    retries += 1;
                    warn!(
                        "Rate limited by provider, retrying in {:?} (retry {})",
                        self.delay, retries
                    );
                    sleeper.sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
