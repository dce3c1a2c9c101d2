/// Retry-once policy for concurrency conflicts
///
/// A `ConcurrencyConflict` means another writer won a race on the same
/// board or task. The whole operation is safe to rerun, so the caller layer
/// runs it one more time; a second conflict is returned to the client.

use std::future::Future;
use taskboard_shared::error::CoreResult;

/// Runs `operation`, rerunning it once if it reports a conflict
pub async fn retry_once<T, F, Fut>(name: &'static str, mut operation: F) -> CoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CoreResult<T>>,
{
    match operation().await {
        Err(err) if err.is_retryable() => {
            tracing::warn!(operation = name, error = %err, "Retrying after concurrency conflict");
            operation().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskboard_shared::error::CoreError;

    #[tokio::test]
    async fn test_conflict_is_retried_once() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result = retry_once("test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CoreError::ConcurrencyConflict("race".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_conflict_is_surfaced() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: CoreResult<()> = retry_once("test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::ConcurrencyConflict("race".to_string()))
        })
        .await;

        assert!(matches!(result, Err(CoreError::ConcurrencyConflict(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let result: CoreResult<()> = retry_once("test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Storage("down".to_string()))
        })
        .await;

        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
