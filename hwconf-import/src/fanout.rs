//! Bounded fan-out that lets every issued write settle
//!
//! Siblings keep running after one of them fails: writes already issued are
//! never dropped mid-flight. The aggregate reports the first failure.

use crate::error::ImportResult;
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::warn;

/// Run `tasks` with at most `limit` in flight and collect their outputs
pub(crate) async fn run_all<I, F, T>(tasks: I, limit: usize) -> ImportResult<Vec<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = ImportResult<T>>,
{
    let results: Vec<ImportResult<T>> = stream::iter(tasks)
        .buffer_unordered(limit.max(1))
        .collect()
        .await;
    settle(results)
}

/// First error wins; later ones are logged
pub(crate) fn settle<T>(results: Vec<ImportResult<T>>) -> ImportResult<Vec<T>> {
    let mut values = Vec::with_capacity(results.len());
    let mut first_error = None;

    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => warn!(error = %err, "Additional failure among concurrent writes"),
        }
    }

    match first_error {
        Some(err) => Err(err),
        None => Ok(values),
    }
}
