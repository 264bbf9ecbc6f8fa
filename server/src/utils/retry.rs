//! Async retry with exponential backoff
//!
//! All mutating store operations and the broker reconnect path share this
//! loop: attempt, sleep 2/4/8/16/32 seconds (with a one second base),
//! attempt again. Errors whose outcome cannot change on a retry (a lookup
//! that found no rows, a key hash that already exists) short-circuit the
//! loop through the `definitive` predicate.

use std::time::Duration;

/// Retry an async operation with exponential backoff.
///
/// The delay before attempt `n` (1-based) is `base * 2^n`, matching the
/// 2, 4, 8, 16, 32 second schedule when `base` is one second. Returns the
/// first success, the first definitive error, or the last error once
/// `max_attempts` is exhausted.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    max_attempts: u32,
    base: Duration,
    mut operation: F,
    definitive: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if definitive(&e) => return Err(e),
            Err(e) => {
                if attempt >= max_attempts {
                    return Err(e);
                }
                let delay = base * 2u32.pow(attempt);
                tracing::warn!(
                    error = %e,
                    attempt,
                    delay_ms = delay.as_millis(),
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn never_definitive(_: &&str) -> bool {
        false
    }

    #[tokio::test]
    async fn success_on_first_try() {
        let result = retry_with_backoff(
            5,
            Duration::from_millis(1),
            || async { Ok::<_, &str>(42) },
            never_definitive,
        )
        .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn success_after_transient_errors() {
        let attempts = RefCell::new(0);
        let result = retry_with_backoff(
            5,
            Duration::from_millis(1),
            || {
                *attempts.borrow_mut() += 1;
                let n = *attempts.borrow();
                async move {
                    if n < 3 { Err("transient") } else { Ok(n) }
                }
            },
            never_definitive,
        )
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let attempts = RefCell::new(0);
        let result: Result<(), _> = retry_with_backoff(
            3,
            Duration::from_millis(1),
            || {
                *attempts.borrow_mut() += 1;
                async { Err("persistent") }
            },
            never_definitive,
        )
        .await;
        assert_eq!(result, Err("persistent"));
        assert_eq!(*attempts.borrow(), 3);
    }

    #[tokio::test]
    async fn definitive_error_short_circuits() {
        let attempts = RefCell::new(0);
        let result: Result<(), _> = retry_with_backoff(
            5,
            Duration::from_millis(1),
            || {
                *attempts.borrow_mut() += 1;
                async { Err("no rows in result set") }
            },
            |e: &&str| e.contains("no rows"),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(*attempts.borrow(), 1);
    }
}
