//! Retry Logic
//!
//! Decides whether a classified request failure is re-issued and how long to
//! wait first. Exponential backoff with symmetric jitter.

use std::time::Duration;

use crate::error::{ErrorKind, MinimaxError};

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries on top of the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
    /// Statuses that make a generic API error retryable.
    pub retryable_statuses: Vec<u16>,
    /// When false, every failure is final.
    pub enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.1,
            retryable_statuses: vec![408, 429, 500, 502, 503, 504],
            enabled: true,
        }
    }
}

impl RetryConfig {
    /// Configuration with retries switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Retry decision interface.
///
/// `attempt` counts retries already performed: 0 when deciding on the first
/// retry.
pub trait RetryPolicy: Send + Sync {
    /// Whether the failed request should be re-issued.
    fn should_retry(&self, error: &MinimaxError, attempt: u32) -> bool;

    /// Delay before re-issuing.
    fn retry_delay(&self, attempt: u32, error: &MinimaxError) -> Duration;
}

/// Default policy driven by [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct DefaultRetryPolicy {
    config: RetryConfig,
}

impl DefaultRetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    fn is_retryable_kind(&self, error: &MinimaxError) -> bool {
        match error.kind() {
            ErrorKind::Network { .. } | ErrorKind::RateLimit { .. } | ErrorKind::Server => true,
            // Without a status the failure happened locally and would repeat.
            ErrorKind::Api => match error.status_code() {
                Some(status) => self.config.retryable_statuses.contains(&status),
                None => false,
            },
            _ => false,
        }
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay =
            self.config.initial_delay.as_millis() as f64 * self.config.multiplier.powi(exponent);

        let jitter_range = base_delay * self.config.jitter;
        let jitter = (rand::random::<f64>() - 0.5) * 2.0 * jitter_range;
        let jittered = (base_delay + jitter).max(0.0);

        let capped = jittered.min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

impl RetryPolicy for DefaultRetryPolicy {
    fn should_retry(&self, error: &MinimaxError, attempt: u32) -> bool {
        self.config.enabled && attempt < self.config.max_retries && self.is_retryable_kind(error)
    }

    fn retry_delay(&self, attempt: u32, error: &MinimaxError) -> Duration {
        error
            .retry_after()
            .unwrap_or_else(|| self.calculate_delay(attempt))
    }
}
