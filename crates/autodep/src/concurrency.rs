//! Bounded fan-out over tokio tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default task limit: one per CPU, at most 8.
pub fn default_concurrency() -> usize {
    num_cpus::get().min(8)
}

/// A spawned task panicked or was cancelled.
#[derive(Debug, thiserror::Error)]
#[error("Background task failed: {0}")]
pub struct TaskError(String);

/// Run `f` over `items` with at most `limit` tasks in flight.
///
/// Results come back in input order regardless of completion order.
pub(crate) async fn map_bounded<I, T, F, Fut>(
    items: Vec<I>,
    limit: usize,
    f: F,
) -> Result<Vec<T>, TaskError>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    let len = items.len();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let task = f(item);
        join_set.spawn(async move {
            // the semaphore is never closed, so the permit is always granted
            let _permit = semaphore.acquire_owned().await;
            (index, task.await)
        });
    }

    let mut slots: Vec<Option<T>> = (0..len).map(|_| None).collect();
    while let Some(joined) = join_set.join_next().await {
        let (index, value) = joined.map_err(|e| TaskError(e.to_string()))?;
        slots[index] = Some(value);
    }

    Ok(slots.into_iter().flatten().collect())
}
