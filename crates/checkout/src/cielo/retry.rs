//! Bounded exponential-backoff retry for gateway calls.
//!
//! Pure exponential backoff, no jitter: `delay, delay * factor,
//! delay * factor^2, ...`. Client errors (see
//! [`CieloError::is_retriable`]) short-circuit after a single attempt.
//! There is no cancellation token - once a retry sequence starts, the only
//! bound is the attempt count.

use std::time::Duration;

use tracing::{error, warn};

use super::CieloError;

/// Retry schedule for gateway calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// The waits between attempts: `max_attempts - 1` entries of
    /// `initial_delay * backoff_factor^n`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let factor = self.backoff_factor;
        let mut next = self.initial_delay;
        (1..self.max_attempts).map(move |_| {
            let current = next;
            next = next.mul_f64(factor);
            current
        })
    }
}

/// Run `operation`, retrying transient failures per `policy`.
///
/// Non-retriable errors (gateway statuses 400/401/403/422) are returned
/// immediately after the first attempt. After exhausting `max_attempts`,
/// the last error is logged and returned.
///
/// # Errors
///
/// Returns the final [`CieloError`] once attempts are exhausted, or the
/// first non-retriable error encountered.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, CieloError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CieloError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retriable() => {
                warn!(attempt, error = %err, "gateway rejected request, not retrying");
                return Err(err);
            }
            Err(err) if attempt >= policy.max_attempts => {
                error!(
                    attempts = attempt,
                    error = %err,
                    "gateway call failed after exhausting retries"
                );
                return Err(err);
            }
            Err(err) => {
                warn!(
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient gateway failure, backing off"
                );
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_factor);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> CieloError {
        CieloError::Api {
            status: 503,
            code: None,
            message: "unavailable".to_string(),
            details: None,
        }
    }

    fn client_error(status: u16) -> CieloError {
        CieloError::Api {
            status,
            code: None,
            message: "rejected".to_string(),
            details: None,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
        }
    }

    #[test]
    fn test_delay_schedule_is_pure_exponential() {
        let delays: Vec<Duration> = policy().delays().collect();
        assert_eq!(
            delays,
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );

        let longer = RetryPolicy {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 3.0,
        };
        let delays: Vec<Duration> = longer.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(300),
                Duration::from_millis(900),
                Duration::from_millis(2700),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_transient_failure_attempts_exactly_max() {
        let attempts = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result: Result<(), CieloError> = with_retry(&policy(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // Waits were 1000ms then 2000ms; paused time advances deterministically.
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retriable_statuses_make_one_attempt() {
        for status in [400, 401, 403, 422] {
            let attempts = AtomicU32::new(0);
            let started = tokio::time::Instant::now();

            let result: Result<(), CieloError> = with_retry(&policy(), || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async move { Err(client_error(status)) }
            })
            .await;

            assert!(result.is_err());
            assert_eq!(
                attempts.load(Ordering::SeqCst),
                1,
                "status {status} must not be retried"
            );
            assert_eq!(started.elapsed(), Duration::ZERO);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_transient_failures() {
        let attempts = AtomicU32::new(0);

        let result = with_retry(&policy(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(transient())
                } else {
                    Ok("authorized")
                }
            }
        })
        .await;

        assert_eq!(result.expect("should succeed on third attempt"), "authorized");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_immediate_success_makes_one_attempt() {
        let attempts = AtomicU32::new(0);

        let result = with_retry(&policy(), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;

        assert_eq!(result.expect("should succeed"), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_error_is_surfaced() {
        let attempts = AtomicU32::new(0);

        let result: Result<(), CieloError> = with_retry(&policy(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(CieloError::Api {
                    status: 500,
                    code: Some(i64::from(n)),
                    message: format!("failure {n}"),
                    details: None,
                })
            }
        })
        .await;

        match result.expect_err("must fail") {
            CieloError::Api { code, .. } => assert_eq!(code, Some(2)),
            CieloError::MissingCredentials => panic!("wrong error variant"),
        }
    }
}
