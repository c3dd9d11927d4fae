use async_trait::async_trait;
use common::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::clients::FetchError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_factor: f64,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_factor: config.backoff_factor,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Delay after attempt `k` (0-indexed): base * factor^k.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let millis = self.base_delay.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        Duration::from_millis(millis.round() as u64)
    }
}

/// Injectable sleep so the full retry sequence can run in tests without
/// wall-clock delay.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs `operation` up to `policy.max_attempts` times, backing off between
/// attempts. Only transient errors are retried; a permanent error or an
/// exhausted attempt limit returns the last error as-is.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: F,
) -> std::result::Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient fetch error, backing off"
                );
                sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
