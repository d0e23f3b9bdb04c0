//! Retry-with-backoff for network-touching subprocess calls.
//!
//! Shared by [`crate::coordinator`]'s store population, fork creation and
//! fetch paths. Validation failures are never retried here; only the
//! operation passed in is, so callers decide what counts as retryable by
//! what they wrap.

use std::future::Future;
use std::time::Duration;

/// Exponential backoff schedule: 1s, 2s, 4s.
const BACKOFF_SCHEDULE: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Run `attempt` up to `BACKOFF_SCHEDULE.len() + 1` times total, sleeping
/// the schedule between failures. Returns the last error if every attempt
/// fails.
pub async fn with_backoff<T, E, F, Fut>(mut attempt: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for delay in BACKOFF_SCHEDULE.iter().copied().map(Some).chain(std::iter::once(None)) {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_err = Some(e);
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_when_first_attempt_works() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(42) }
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_up_to_schedule_length_plus_one_then_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_backoff(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("still failing") }
        })
        .await;
        assert_eq!(result, Err("still failing"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_backoff(|| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err("transient")
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
