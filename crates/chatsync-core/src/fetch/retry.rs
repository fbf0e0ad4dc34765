use crate::config::CoreConfig;
use crate::error::FetchError;
use crate::fetch::BackoffMachine;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the overall deadline from `config` passes.
///
/// Transient failures (network, 5xx) are retried after a jittered backoff
/// when `should_retry` is set. The attempts run on their own task: when the
/// deadline fires this returns [`FetchError::Timeout`] at once, even if an
/// attempt is still outstanding, and `cancel` is triggered so the loop
/// stops at its next check instead of issuing more requests nobody will read.
/// Cancelling `cancel` from outside ends the loop the same way.
pub async fn try_fetch<T, F, Fut>(
    operation: F,
    should_retry: bool,
    config: &CoreConfig,
    cancel: CancellationToken,
) -> Result<T, FetchError>
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
{
    let deadline = config.request_long_timeout();
    let backoff = BackoffMachine::from_config(config);
    let task = tokio::spawn(retry_loop(operation, should_retry, backoff, cancel.clone()));

    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            if join_error.is_panic() {
                std::panic::resume_unwind(join_error.into_panic());
            }
            Err(FetchError::Cancelled)
        }
        Err(_) => {
            cancel.cancel();
            Err(FetchError::Timeout(deadline))
        }
    }
}

async fn retry_loop<T, F, Fut>(
    mut operation: F,
    should_retry: bool,
    mut backoff: BackoffMachine,
    cancel: CancellationToken,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    loop {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if !(should_retry && error.is_retryable()) {
            return Err(error);
        }

        let delay = backoff.next_delay();
        debug!(
            error = %error,
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Transient fetch failure, backing off"
        );
        tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn make_test_counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    #[tokio::test(start_paused = true)]
    async fn test_retryable_errors_run_until_deadline() {
        let config = CoreConfig::default();
        let attempts = make_test_counter();
        let counter = attempts.clone();
        let start = Instant::now();

        let result: Result<(), FetchError> = try_fetch(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Server5xx { status: 503 })
                }
            },
            true,
            &config,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(result, Err(FetchError::Timeout(Duration::from_secs(60))));
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert!(attempts.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_fails_fast() {
        let config = CoreConfig::default();
        let attempts = make_test_counter();
        let counter = attempts.clone();
        let start = Instant::now();

        let result: Result<(), FetchError> = try_fetch(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::MalformedResponse("truncated".into()))
                }
            },
            true,
            &config,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(result, Err(FetchError::MalformedResponse("truncated".into())));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let config = CoreConfig::default();
        let attempts = make_test_counter();
        let counter = attempts.clone();

        let result = try_fetch(
            move || {
                let counter = counter.clone();
                async move {
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        0 => Err(FetchError::Network("connection reset".into())),
                        1 => Err(FetchError::Server5xx { status: 502 }),
                        _ => Ok(42),
                    }
                }
            },
            true,
            &config,
            CancellationToken::new(),
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_should_retry_false_returns_first_error() {
        let config = CoreConfig::default();
        let result: Result<(), FetchError> = try_fetch(
            || async { Err(FetchError::Network("offline".into())) },
            false,
            &config,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, Err(FetchError::Network("offline".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_is_abandoned_and_not_retried() {
        let config = CoreConfig::default();
        let attempts = make_test_counter();
        let counter = attempts.clone();

        let result: Result<(), FetchError> = try_fetch(
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(90)).await;
                    Err(FetchError::Network("late failure".into()))
                }
            },
            true,
            &config,
            CancellationToken::new(),
        )
        .await;
        assert_eq!(result, Err(FetchError::Timeout(Duration::from_secs(60))));

        // Let the abandoned call finish; the loop must notice the expiry.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_cancel_stops_loop() {
        let config = CoreConfig::default();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let result: Result<(), FetchError> = try_fetch(
            || async { Err(FetchError::Network("down".into())) },
            true,
            &config,
            cancel,
        )
        .await;
        assert_eq!(result, Err(FetchError::Cancelled));
    }
}
