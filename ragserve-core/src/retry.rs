//! Bounded retry policy for remote service calls.
//!
//! Both remote providers share one policy instead of hand-rolled
//! sleep-and-retry blocks: a fixed number of attempts with a fixed
//! backoff between them, retrying only errors the caller classifies as
//! transient (a "model loading" response, for instance).

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// A bounded retry policy with fixed backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    /// One retry after a 2 second backoff.
    fn default() -> Self {
        Self { max_attempts: 2, backoff: Duration::from_secs(2) }
    }
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` total attempts with a
    /// fixed `backoff` between them. `max_attempts` is clamped to at
    /// least one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff }
    }

    /// Total attempts allowed, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, retrying while it fails with an error `is_transient`
    /// accepts and attempts remain. Non-transient errors and the final
    /// attempt's error are returned as-is.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_transient: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && is_transient(&e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = self.backoff.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_attempts_exhausted() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("loading".to_string())
                },
                |_| true,
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_permanent_errors() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = policy
            .run(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("bad request".to_string())
                },
                |e| e == "loading",
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = policy
            .run(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 { Err("loading".to_string()) } else { Ok(n) }
                },
                |_| true,
            )
            .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
