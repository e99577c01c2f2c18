use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::*;
use crate::test_utils::enable_logger;
use crate::BackoffPolicy;
use crate::Error;

fn fast_policy(max_retries: usize) -> BackoffPolicy {
    BackoffPolicy {
        max_retries,
        timeout_ms: 200,
        base_delay_ms: 1,
        max_delay_ms: 5,
    }
}

fn conflict() -> Error {
    Error::CasConflict {
        path: "/casbin".to_string(),
    }
}

#[tokio::test]
async fn test_first_attempt_success_returns_immediately() {
    enable_logger();
    let attempts = AtomicUsize::new(0);

    let result = run_with_backoff(
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        },
        &fast_policy(5),
        Error::is_cas_conflict,
    )
    .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_retryable_error_retried_until_success() {
    enable_logger();
    let attempts = AtomicUsize::new(0);

    let result = run_with_backoff(
        || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(conflict())
            } else {
                Ok("done")
            }
        },
        &fast_policy(5),
        Error::is_cas_conflict,
    )
    .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_non_retryable_error_returned_unchanged() {
    enable_logger();
    let attempts = AtomicUsize::new(0);

    let result: crate::Result<()> = run_with_backoff(
        || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Read {
                path: "/casbin".to_string(),
                reason: "boom".to_string(),
            })
        },
        &fast_policy(5),
        Error::is_cas_conflict,
    )
    .await;

    assert!(matches!(result.unwrap_err(), Error::Read { .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_exhaustion_reports_attempts_and_last_error() {
    enable_logger();

    let result: crate::Result<()> =
        run_with_backoff(|| async { Err(conflict()) }, &fast_policy(3), Error::is_cas_conflict).await;

    match result.unwrap_err() {
        Error::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert!(last.is_cas_conflict());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_attempt_timeout_surfaces_when_not_retryable() {
    let policy = BackoffPolicy {
        max_retries: 3,
        timeout_ms: 10,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };

    let result: crate::Result<()> = run_with_backoff(
        || async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        },
        &policy,
        Error::is_cas_conflict,
    )
    .await;

    assert!(matches!(result.unwrap_err(), Error::Timeout(_)));
}
