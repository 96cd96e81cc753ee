//! Retry handler
//!
//! Wraps a single operation with exponential backoff. The delay before retry
//! `n` (zero-based) is `min(base_delay * backoff_factor^n, max_delay)`. With
//! jitter enabled a uniform random amount in `[0, 0.25 * delay)` is added on
//! top, and the result is clamped to `max_delay` again, so jitter only ever
//! lengthens a wait and never pushes it past the ceiling.
//!
//! Errors whose [`Error::is_retryable`] is false end the loop at once.

pub mod sleeper;

pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fraction of the computed delay used as the jitter range
const JITTER_RATIO: f64 = 0.25;

/// Progress of one retry-wrapped call
#[derive(Debug, Default)]
pub struct RetryState {
    /// Zero-based attempt number
    pub attempt: u32,

    /// Error from the most recent failed attempt
    pub last_error: Option<Error>,

    /// Delay chosen before the next attempt
    pub computed_delay: Duration,
}

/// Backoff policy plus the loop that applies it
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    jitter: bool,
    deadline: Option<Duration>,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_factor: 2.0,
            jitter: true,
            deadline: None,
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

impl RetryPolicy {
    /// Build a policy from configuration
    pub fn from_config(config: &RetryConfig) -> Result<Self> {
        if !config.backoff_factor.is_finite() || config.backoff_factor < 1.0 {
            return Err(Error::config(format!(
                "retry.backoff_factor must be a finite number >= 1, got {}",
                config.backoff_factor
            )));
        }

        let base_delay = secs(config.base_delay_secs, "retry.base_delay")?;
        let max_delay = secs(config.max_delay_secs, "retry.max_delay")?;
        if base_delay > max_delay {
            return Err(Error::config("retry.base_delay must not exceed retry.max_delay"));
        }

        let deadline = config
            .deadline_secs
            .map(|d| secs(d, "retry.deadline"))
            .transpose()?;

        Ok(Self {
            max_retries: config.max_retries,
            base_delay,
            max_delay,
            backoff_factor: config.backoff_factor,
            jitter: config.jitter,
            deadline,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the sleeper
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Set the retry count (0 means a single attempt)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay bounds
    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay.max(base_delay);
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Bound the total wall-clock time of one call
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Configured retry count
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Configured delay ceiling
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay before retrying after failed attempt `attempt`, without jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        if capped.is_finite() {
            Duration::from_secs_f64(capped.max(0.0))
        } else {
            self.max_delay
        }
    }

    /// Delay before retrying after failed attempt `attempt`
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter {
            return delay;
        }

        let extra = delay.mul_f64(JITTER_RATIO * rand::rng().random::<f64>());
        (delay + extra).min(self.max_delay)
    }

    /// Run `operation` until it succeeds or the policy gives up
    ///
    /// The operation is invoked at most `max_retries + 1` times. The last
    /// failure is returned unchanged.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut state = RetryState::default();

        for attempt in 0..=self.max_retries {
            state.attempt = attempt;
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => {
                    debug!("Not retrying {} error: {}", e.kind(), e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Attempt {} of {} failed: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );

                    if attempt == self.max_retries {
                        state.last_error = Some(e);
                        break;
                    }

                    state.computed_delay = self.compute_delay(attempt);
                    if let Some(deadline) = self.deadline
                        && started.elapsed() + state.computed_delay > deadline
                    {
                        warn!("Retry deadline of {:?} reached, giving up", deadline);
                        return Err(e);
                    }
                    state.last_error = Some(e);

                    debug!("Retrying in {:?}", state.computed_delay);
                    self.sleeper.sleep(state.computed_delay).await;
                }
            }
        }

        Err(state
            .last_error
            .unwrap_or_else(|| Error::Other("Retry loop ended without an attempt".to_string())))
    }
}

fn secs(value: f64, field: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| Error::config(format!("{} must be a non-negative number of seconds", field)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_retries: u32) -> (RetryPolicy, TrackingSleeper) {
        let sleeper = TrackingSleeper::new();
        let policy = RetryPolicy::default()
            .with_max_retries(max_retries)
            .with_delays(Duration::from_secs(1), Duration::from_secs(10))
            .with_jitter(false)
            .with_sleeper(Arc::new(sleeper.clone()));
        (policy, sleeper)
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let (policy, sleeper) = policy(0);
        let calls = &AtomicU32::new(0);

        let result: Result<()> = policy
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::transient("mock", "down"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backoff_sequence_saturates() {
        let (policy, sleeper) = policy(5);

        let _: Result<()> = policy
            .execute(|| async move { Err(Error::transient("mock", "down")) })
            .await;

        assert_eq!(
            sleeper.calls(),
            [1, 2, 4, 8, 10].map(Duration::from_secs).to_vec()
        );
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let (policy, sleeper) = policy(3);
        let calls = &AtomicU32::new(0);

        let result = policy
            .execute(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::transient("mock", "flaky"))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(sleeper.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let (policy, _) = policy(3);
        let calls = &AtomicU32::new(0);

        let result: Result<()> = policy
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::permanent("mock", "bad recipient"))
            })
            .await;

        assert!(matches!(result, Err(Error::PermanentProvider { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_stops_before_oversleeping() {
        let (policy, sleeper) = policy(5);
        let policy = policy.with_deadline(Duration::from_millis(1500));
        let calls = &AtomicU32::new(0);

        let _: Result<()> = policy
            .execute(|| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::transient("mock", "down"))
            })
            .await;

        // The first 1s wait fits, the following 2s wait would not
        assert_eq!(sleeper.calls(), vec![Duration::from_secs(1)]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_config_validation() {
        let mut config = RetryConfig::default();
        assert!(RetryPolicy::from_config(&config).is_ok());

        config.backoff_factor = 0.5;
        assert!(RetryPolicy::from_config(&config).is_err());

        config.backoff_factor = 2.0;
        config.base_delay_secs = -1.0;
        assert!(RetryPolicy::from_config(&config).is_err());
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let (policy, _) = policy(3);
        assert_eq!(policy.base_delay_for(u32::MAX), Duration::from_secs(10));
    }
}
