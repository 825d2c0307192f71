//! Bounded retry with fixed or exponential delay.
//!
//! The policy is a plain value so it can be tested without any I/O; [`RetryPolicy::run`]
//! applies it to an async operation.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Delay strategy between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// Delay multiplied after every retry, capped at `max`.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Upper bound for any single delay.
        max: Duration,
        /// Growth factor per retry.
        multiplier: f64,
    },
}

/// Retry policy for waiting on a database that may not accept connections yet.
///
/// Defaults: 10 attempts, 300ms apart, and 10 rounds for the outer
/// marker-recording loop.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct RetryPolicy {
    /// Maximum attempts per round, including the first one (default: 10).
    pub max_attempts: u32,
    /// Delay strategy between attempts (default: fixed 300ms).
    pub backoff: Backoff,
    /// Maximum rounds of the outer best-effort loop (default: 10).
    pub max_rounds: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: Backoff::Fixed(Duration::from_millis(300)),
            max_rounds: 10,
        }
    }
}

/// Failure of the last attempt once a policy is exhausted.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Attempts made.
    pub attempts: u32,
    /// Error from the final attempt.
    pub last_error: E,
}

impl RetryPolicy {
    /// Create a new retry policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum attempts per round. Values below 1 are treated as 1.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    /// Use a fixed delay between attempts.
    #[must_use]
    pub fn fixed_delay(mut self, delay: Duration) -> Self {
        self.backoff = Backoff::Fixed(delay);
        self
    }

    /// Use exponential backoff between attempts.
    #[must_use]
    pub fn exponential(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.backoff = Backoff::Exponential {
            initial,
            max,
            multiplier,
        };
        self
    }

    /// Set the maximum rounds of the outer loop. Values below 1 are treated as 1.
    #[must_use]
    pub fn max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    /// A policy that tries exactly once.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Fixed(Duration::ZERO),
            max_rounds: 1,
        }
    }

    /// Delay to wait before `attempt` (zero-based). The first attempt never waits.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                max,
                multiplier,
            } => {
                let base = initial.as_millis() as f64 * multiplier.powi(attempt.saturating_sub(1) as i32);
                let capped = base.min(max.as_millis() as f64);
                Duration::from_millis(capped as u64)
            }
        }
    }

    /// Check if another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the zero-based attempt number. Every failure but the last
    /// is logged at `debug` and followed by the policy delay.
    pub async fn run<T, E, F, Fut>(&self, what: &str, op: F) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.run_while(what, |_| true, op).await
    }

    /// Like [`run`](Self::run), but gives up as soon as `retryable` rejects
    /// an error.
    pub async fn run_while<T, E, F, Fut, P>(
        &self,
        what: &str,
        retryable: P,
        mut op: F,
    ) -> Result<T, RetryExhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if !self.should_retry(attempt) || !retryable(&e) {
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: e,
                        });
                    }
                    tracing::debug!(
                        what = what,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "attempt failed, retrying"
                    );
                }
            }
        }
    }
}
