//! Bounded "wait for X to appear" loops.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout_at, Instant};

use crate::ble::PollOptions;
use crate::error::BackendError;

/// Why a wait ended without a value.
#[derive(Debug, Error)]
pub enum PollError {
    /// The deadline passed first.
    #[error("timed out after {waited:?}")]
    TimedOut { waited: Duration },
    /// The backend reports that the condition can no longer become true.
    #[error("search exhausted")]
    Exhausted,
    /// A check failed.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Run `check` until it yields a value.
///
/// The first check runs immediately. After that the check runs every
/// `poll_interval` until it returns `Some` or an error. With `options.timeout`
/// set, the whole wait (including a check that never completes) is cut off at
/// the deadline.
pub async fn wait_for<T, F, Fut>(options: &PollOptions, check: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PollError>>,
{
    let started = Instant::now();
    let polling = poll_until_found(options.poll_interval, check);
    match options.timeout {
        Some(timeout) => timeout_at(started + timeout, polling)
            .await
            .unwrap_or_else(|_| {
                Err(PollError::TimedOut {
                    waited: started.elapsed(),
                })
            }),
        None => polling.await,
    }
}

async fn poll_until_found<T, F, Fut>(interval: Duration, mut check: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, PollError>>,
{
    loop {
        if let Some(found) = check().await? {
            return Ok(found);
        }
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn options(timeout: Option<Duration>) -> PollOptions {
        PollOptions {
            poll_interval: Duration::from_millis(50),
            timeout,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_immediately_when_present() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();
        let value = wait_for(&options(Some(Duration::from_secs(1))), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, PollError>(Some(7))
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn polls_at_interval_until_found() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();
        let value = wait_for(&options(None), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, PollError>((n == 3).then_some("ready"))
        })
        .await
        .unwrap();
        assert_eq!(value, "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_at_deadline() {
        let result: Result<(), _> =
            wait_for(&options(Some(Duration::from_millis(120))), || async { Ok::<_, PollError>(None) }).await;
        match result {
            Err(PollError::TimedOut { waited }) => assert_eq!(waited, Duration::from_millis(120)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn check_errors_end_the_wait() {
        let result: Result<(), _> = wait_for(&options(None), || async {
            Err::<Option<()>, _>(PollError::Backend("adapter went away".into()))
        })
        .await;
        assert!(matches!(result, Err(PollError::Backend(_))));

        let result: Result<(), _> =
            wait_for(&options(None), || async { Err::<Option<()>, _>(PollError::Exhausted) }).await;
        assert!(matches!(result, Err(PollError::Exhausted)));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_check_is_cut_off_at_deadline() {
        let result: Result<(), _> = wait_for(&options(Some(Duration::from_secs(1))), || {
            std::future::pending::<Result<Option<()>, PollError>>()
        })
        .await;
        match result {
            Err(PollError::TimedOut { waited }) => assert_eq!(waited, Duration::from_secs(1)),
            other => panic!("unexpected {other:?}"),
        }
    }
}
