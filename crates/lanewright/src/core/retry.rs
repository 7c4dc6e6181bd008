//! Bounded exponential backoff for remote calls
//!
//! Every canvas and task call goes through [`with_retry`]. Waiting and
//! randomness are injected through [`Clock`] and [`Jitter`] so the schedule
//! can be asserted without sleeping.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::RemoteApiError;

/// Retry schedule for remote calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
    /// Scale each delay by a random factor in [0.5, 1.0]
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), before jitter
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.initial_delay_ms as f64 * self.multiplier.powi(exponent);
        let capped = millis.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Delay before retry number `retry` (1-based), jitter applied
    pub fn delay_for(&self, retry: u32, jitter: &dyn Jitter) -> Duration {
        let base = self.base_delay(retry);
        if self.jitter {
            base.mul_f64(jitter.factor().clamp(0.5, 1.0))
        } else {
            base
        }
    }
}

/// Source of waiting
pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of the delay scaling factor
pub trait Jitter: Send + Sync {
    /// A factor in [0.5, 1.0]
    fn factor(&self) -> f64;
}

/// Uniform random factor from the thread-local generator
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn factor(&self) -> f64 {
        rand::rng().random_range(0.5..=1.0)
    }
}

/// Always 1.0
#[derive(Debug, Default, Clone, Copy)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn factor(&self) -> f64 {
        1.0
    }
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted. The last error is returned unchanged.
pub fn with_retry<T, F>(
    policy: &RetryPolicy,
    clock: &dyn Clock,
    jitter: &dyn Jitter,
    operation: &str,
    mut call: F,
) -> Result<T, RemoteApiError>
where
    F: FnMut() -> Result<T, RemoteApiError>,
{
    let total = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call() {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < total => {
                let delay = policy.delay_for(attempt, jitter);
                warn!(
                    error = %e,
                    operation,
                    attempt,
                    total,
                    delay_ms = delay.as_millis() as u64,
                    "remote call failed; retrying"
                );
                clock.sleep(delay);
                attempt += 1;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    operation,
                    attempt,
                    retryable = e.is_retryable(),
                    "remote call failed; giving up"
                );
                return Err(e);
            }
        }
    }
}
