use std::future::Future;

/// Runs `task` up to `attempts` times in sequence and returns the first
/// success, or the last error once every attempt has failed. No backoff.
///
/// `attempts` below one is treated as one.
pub async fn with_retry<T, E, F, Fut>(attempts: usize, mut task: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut tried = 1;
    loop {
        match task().await {
            Ok(v) => return Ok(v),
            Err(e) if tried >= attempts => return Err(e),
            Err(_) => tried += 1,
        }
    }
}

/// [`with_retry`], but exhaustion is answered by `on_exhaustion(last_error)`
/// instead of an error.
pub async fn with_retry_or<T, E, F, Fut, G>(attempts: usize, task: F, on_exhaustion: G) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    G: FnOnce(E) -> T,
{
    match with_retry(attempts, task).await {
        Ok(v) => v,
        Err(e) => on_exhaustion(e),
    }
}
