use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Runs an async operation, retrying transient failures a bounded number
/// of times with a fixed pause between attempts.
///
/// Total runs = 1 initial + `retries`. The last error is returned when
/// every attempt fails.
pub async fn with_retry<F, Fut, T, E>(mut operation: F, retries: usize, delay: Duration) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(Into::into) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(attempt, retries, error = %err, "Attempt failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_transient_failures() {
        let attempts = AtomicUsize::new(0);
        let result = with_retry(
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(anyhow!("transient"))
                } else {
                    Ok(n)
                }
            },
            3,
            Duration::from_millis(10),
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_budget() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), _> = with_retry(
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(anyhow!("permanent"))
            },
            2,
            Duration::from_millis(10),
        )
        .await;
        assert!(result.is_err());
        // 1 initial + 2 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
