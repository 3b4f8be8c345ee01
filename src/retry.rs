//! Retry logic for operations that may fail transiently, bounded by a
//! wall-clock budget.

use log::debug;
use std::future::Future;
use std::time::Duration;

/// Default delay between retry attempts.
pub const DEFAULT_SLEEP: Duration = Duration::from_secs(10);

/// Retry configuration: a total time budget and the delay between attempts.
///
/// The default policy never retries (`timeout` is zero); callers opt into
/// waiting by setting a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total retry budget. Zero disables retrying entirely.
    pub timeout: Duration,
    /// Delay before each retry attempt.
    pub sleep: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            sleep: DEFAULT_SLEEP,
        }
    }
}

impl RetryPolicy {
    /// A policy that waits up to `timeout`, sleeping [`DEFAULT_SLEEP`]
    /// between attempts.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

/// Retries an async operation on failures the `is_retryable` predicate
/// classifies as transient, until the policy's time budget runs out.
///
/// The operation is always invoked at least once, regardless of the
/// timeout. A non-retryable error propagates immediately. The budget check
/// (`iteration * sleep < timeout`) happens before sleeping, against the
/// nominal delay total rather than actual elapsed time, so the final
/// attempt may overrun the timeout by up to one sleep interval (more if
/// the operation itself is slow). The timeout is an approximate bound,
/// not a hard deadline, and in-flight attempts are never cancelled.
///
/// Whatever error the last attempt produced is returned unchanged, so
/// callers can keep matching on its message.
pub async fn retry_with_timeout<T, E, F, Fut, P>(
    mut operation: F,
    is_retryable: P,
    policy: RetryPolicy,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut iteration: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !is_retryable(&e) {
                    return Err(e);
                }
                if policy.sleep * iteration >= policy.timeout {
                    return Err(e);
                }
                debug!(
                    "attempt {} failed with a retryable error, retrying in {:?}",
                    iteration, policy.sleep
                );
                tokio::time::sleep(policy.sleep).await;
                iteration += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn retryable(e: &anyhow::Error) -> bool {
        e.to_string().contains("retry")
    }

    /// Policy equivalent to timeout 2s / sleep 1s, scaled down for tests.
    fn two_to_one() -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(20),
            sleep: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn succeeds_first_time_with_zero_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>("success")
                }
            },
            retryable,
            RetryPolicy::default(),
        )
        .await;

        assert_eq!(res.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_first_time_with_budget_left() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, anyhow::Error>("success")
                }
            },
            retryable,
            RetryPolicy {
                timeout: Duration::from_millis(50),
                sleep: Duration::from_millis(10),
            },
        )
        .await;

        assert_eq!(res.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn succeeds_on_second_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(anyhow!("please retry again"))
                    } else {
                        Ok("success")
                    }
                }
            },
            retryable,
            two_to_one(),
        )
        .await;

        assert_eq!(res.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fails_immediately_on_non_retryable_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res: Result<(), _> = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("no no no"))
                }
            },
            retryable,
            RetryPolicy {
                timeout: Duration::from_millis(50),
                sleep: Duration::from_millis(10),
            },
        )
        .await;

        assert_eq!(res.unwrap_err().to_string(), "no no no");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fails_immediately_with_zero_timeout() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res: Result<(), _> = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("please retry again"))
                }
            },
            retryable,
            RetryPolicy::default(),
        )
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test_log::test(tokio::test)]
    async fn exhausts_budget_after_two_attempts() {
        // iteration 1: 1 * sleep < timeout, retry. iteration 2: 2 * sleep
        // >= timeout, stop. Exactly two calls.
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res: Result<(), _> = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("please retry again"))
                }
            },
            retryable,
            two_to_one(),
        )
        .await;

        assert_eq!(res.unwrap_err().to_string(), "please retry again");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn propagates_the_last_error_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let res: Result<(), String> = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(format!("retry attempt {}", n))
                }
            },
            |e: &String| e.contains("retry"),
            two_to_one(),
        )
        .await;

        // The error of the second (last) attempt comes back verbatim.
        assert_eq!(res.unwrap_err(), "retry attempt 2");
    }

    #[tokio::test]
    async fn sleeps_between_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let start = std::time::Instant::now();

        let _: Result<(), _> = retry_with_timeout(
            || {
                let calls = Arc::clone(&counter);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow!("please retry again"))
                }
            },
            retryable,
            RetryPolicy {
                timeout: Duration::from_millis(100),
                sleep: Duration::from_millis(40),
            },
        )
        .await;

        // Two retries fit the budget, so two sleeps of 40ms happened.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
