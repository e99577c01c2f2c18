use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::warn;

use crate::BackoffPolicy;
use crate::Error;
use crate::Result;

/// Runs `task` up to `policy.max_retries` times with exponential backoff.
///
/// Each attempt is bounded by `policy.timeout_ms`. Only errors accepted by
/// `retryable` are retried; anything else is returned to the caller
/// unchanged. The delay doubles per attempt, capped at `policy.max_delay_ms`,
/// with a small random jitter so contending writers don't stay in lockstep.
pub(crate) async fn run_with_backoff<F, T, P>(
    task: F,
    policy: &BackoffPolicy,
    retryable: fn(&Error) -> bool,
) -> Result<P>
where
    F: Fn() -> T,
    T: std::future::Future<Output = Result<P>>,
{
    let max_attempts = policy.max_retries.max(1);
    let timeout_duration = Duration::from_millis(policy.timeout_ms);
    let mut delay = Duration::from_millis(policy.base_delay_ms);
    let mut attempts = 0;

    loop {
        attempts += 1;
        let outcome = match timeout(timeout_duration, task()).await {
            Ok(Ok(r)) => return Ok(r),
            Ok(Err(error)) => error,
            Err(_) => Error::Timeout(timeout_duration),
        };

        if !retryable(&outcome) {
            return Err(outcome);
        }
        if attempts >= max_attempts {
            warn!("task failed after {attempts} attempts: {outcome}");
            return Err(Error::RetryExhausted {
                attempts,
                last: Box::new(outcome),
            });
        }

        warn!("attempt {attempts} failed: {outcome}, retrying in {delay:?}");
        sleep(with_jitter(delay)).await;
        delay = (delay * 2).min(Duration::from_millis(policy.max_delay_ms));
    }
}

fn with_jitter(delay: Duration) -> Duration {
    let mut rng = StdRng::from_entropy();
    let spread = (delay.as_millis() as u64 / 4).max(1);
    delay + Duration::from_millis(rng.gen_range(0..spread))
}
