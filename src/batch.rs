use std::future::Future;

use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unit {index} failed")]
pub struct BatchFailure<E> {
    pub index: usize,
    #[source]
    pub source: E,
}

async fn tagged<T, E, F>(index: usize, unit: F) -> (usize, Result<T, E>)
where
    F: Future<Output = Result<T, E>>,
{
    (index, unit.await)
}

/// Runs `units` with at most `limit` in flight, returning outputs in input
/// order. Stops at the first error; a zero `limit` yields nothing.
pub async fn run_all<T, E, F>(units: Vec<F>, limit: usize) -> Result<Vec<T>, BatchFailure<E>>
where
    F: Future<Output = Result<T, E>>,
{
    if limit == 0 || units.is_empty() {
        return Ok(Vec::new());
    }

    let total = units.len();
    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    let mut queued = units.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();

    for (index, unit) in queued.by_ref().take(limit) {
        in_flight.push(tagged(index, unit));
    }

    while let Some((index, outcome)) = in_flight.next().await {
        match outcome {
            Ok(value) => slots[index] = Some(value),
            Err(source) => return Err(BatchFailure { index, source }),
        }
        if let Some((next, unit)) = queued.next() {
            in_flight.push(tagged(next, unit));
        }
    }

    Ok(slots.into_iter().flatten().collect())
}
