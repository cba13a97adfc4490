//! Bounded retry loop with randomized pauses.
//!
//! Every request the crawler makes goes through [`retry_async`]: a fixed cap
//! on attempts and a pause drawn uniformly from a [`DelayRange`] between
//! attempts. The pause is deliberately flat rather than exponential so the
//! request rate stays in the range the target site tolerates.

use crate::config::{CrawlConfig, DelayRange, NetworkConfig};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Range the pause between attempts is drawn from.
    pub delay: DelayRange,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: NetworkConfig::MAX_ATTEMPTS,
            delay: DelayRange::new(NetworkConfig::RETRY_DELAY_MIN, NetworkConfig::RETRY_DELAY_MAX),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry settings of a crawl run.
    pub fn from_crawl_config(config: &CrawlConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            delay: config.retry_delay(),
        }
    }

    /// Set the maximum number of attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the pause range.
    pub fn with_delay(mut self, delay: DelayRange) -> Self {
        self.delay = delay;
        self
    }

    /// Pause before the next attempt.
    pub fn calculate_delay(&self) -> Duration {
        self.delay.sample()
    }
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Total delay accumulated.
    pub total_delay: Duration,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Retry an async operation.
///
/// # Arguments
///
/// * `config` - Retry configuration; at least one attempt is always made
/// * `operation` - Async function that returns a Result
/// * `should_retry` - Predicate to determine if an error is retryable
///
/// # Returns
///
/// A tuple of (Result, RetryStats)
pub async fn retry_async<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut stats = RetryStats::default();
    let mut attempt = 0;

    loop {
        attempt += 1;
        stats.attempts = attempt;

        let e = match operation().await {
            Ok(value) => {
                stats.success = true;
                if attempt > 1 {
                    debug!("Operation succeeded after {} attempts", attempt);
                }
                return (Ok(value), stats);
            }
            Err(e) => e,
        };
        stats.last_error = Some(e.to_string());

        if !should_retry(&e) {
            debug!("Error is not retryable: {}", e);
            return (Err(e), stats);
        }

        if attempt >= max_attempts {
            warn!(
                "All {} attempts exhausted. Last error: {}",
                max_attempts, e
            );
            return (Err(e), stats);
        }

        let delay = config.calculate_delay();
        stats.total_delay += delay;

        warn!(
            "Attempt {}/{} failed: {}. Retrying in {:?}",
            attempt, max_attempts, e, delay
        );

        tokio::time::sleep(delay).await;
    }
}
