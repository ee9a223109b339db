//! Fixed-delay retry for fallible remote calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounded retry with a constant pause between attempts (no backoff)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// The error of the final attempt is returned unchanged.
    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max_attempts => {
                    warn!("{} failed after {} attempts: {}", what, attempt, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        what, attempt, max_attempts, e
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let calls = Cell::new(0);
        let result: Result<&str, String> = quick(3)
            .run("flaky", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(format!("failure {}", n))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error() {
        let calls = Cell::new(0);
        let result: Result<(), String> = quick(3)
            .run("broken", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { Err(format!("failure {}", n)) }
            })
            .await;
        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 0,
            delay: Duration::ZERO,
        };
        let _: Result<(), &str> = policy
            .run("once", || {
                calls.set(calls.get() + 1);
                async { Err("nope") }
            })
            .await;
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(2));
    }
}
