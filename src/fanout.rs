use std::future::Future;

use futures_util::future::try_join_all;
use futures_util::stream::{self, StreamExt};

/// Most storage operations kept in flight by [`best_effort`].
pub const MAX_IN_FLIGHT: usize = 32;

/// Polls every future concurrently and fails with the first error.
/// Used for collection batches.
///
/// Futures still pending when one fails are dropped. Work they already
/// handed to the remote side is not rolled back.
pub async fn all_or_nothing<I, F, T, E>(futures: I) -> Result<Vec<T>, E>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    try_join_all(futures).await
}

/// Runs every future to completion, at most `limit` at a time, and splits
/// the outcomes into successes and errors. Used for the file store.
pub async fn best_effort<I, F, T, E>(futures: I, limit: usize) -> (Vec<T>, Vec<E>)
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    let outcomes: Vec<Result<T, E>> = stream::iter(futures)
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    let mut successes = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => successes.push(value),
            Err(e) => errors.push(e),
        }
    }
    (successes, errors)
}
