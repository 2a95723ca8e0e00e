//! Bounded worker pool
//!
//! Runs one CPU-bound task per input on tokio's blocking threads, with at most
//! `max_parallel` tasks in flight. A task failing with a retryable error is
//! rerun on the same input up to `max_retries` times. The first fatal error
//! aborts the tasks still pending and is returned; no partial output escapes.

use super::stats::Phase;
use crate::error::{ErrorCode, MapmulError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Outputs of a pool run, in input order
#[derive(Debug)]
pub struct PoolOutput<O> {
    pub outputs: Vec<O>,
    pub retries: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    max_parallel: usize,
    max_retries: u32,
}

impl WorkerPool {
    pub fn new(max_parallel: usize, max_retries: u32) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            max_retries,
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Run `task` over every input
    pub async fn run<I, O, F>(&self, phase: Phase, inputs: Vec<I>, task: F) -> Result<PoolOutput<O>>
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
        F: Fn(&I) -> Result<O> + Send + Sync + 'static,
    {
        let total = inputs.len();
        debug!(
            "{} phase: {} tasks (max parallel: {})",
            phase, total, self.max_parallel
        );

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let task = Arc::new(task);
        let mut futures = FuturesUnordered::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let task = Arc::clone(&task);
            let input = Arc::new(input);
            let max_retries = self.max_retries;

            futures.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    MapmulError::execution(
                        ErrorCode::EXEC_CANCELLED,
                        format!("{} task {} could not be scheduled", phase, index),
                    )
                    .with_source(e)
                })?;
                let (output, retries) =
                    run_with_retries(phase, index, input, task, max_retries).await?;
                Ok::<_, MapmulError>((index, output, retries))
            }));
        }

        let mut slots: Vec<Option<O>> = (0..total).map(|_| None).collect();
        let mut retries = 0;

        while let Some(joined) = futures.next().await {
            let failure = match joined {
                Ok(Ok((index, output, task_retries))) => {
                    slots[index] = Some(output);
                    retries += task_retries;
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => MapmulError::execution(
                    ErrorCode::EXEC_WORKER_PANICKED,
                    format!("{} worker task failed to complete", phase),
                )
                .with_source(e),
            };

            for pending in futures.iter() {
                pending.abort();
            }
            return Err(failure);
        }

        Ok(PoolOutput {
            outputs: slots.into_iter().flatten().collect(),
            retries,
        })
    }
}

/// Run one task, retrying transient failures
async fn run_with_retries<I, O, F>(
    phase: Phase,
    index: usize,
    input: Arc<I>,
    task: Arc<F>,
    max_retries: u32,
) -> Result<(O, usize)>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
    F: Fn(&I) -> Result<O> + Send + Sync + 'static,
{
    let mut attempt: u32 = 0;
    loop {
        let input = Arc::clone(&input);
        let task = Arc::clone(&task);
        let outcome = tokio::task::spawn_blocking(move || task(&input))
            .await
            .map_err(|e| {
                MapmulError::execution(
                    ErrorCode::EXEC_WORKER_PANICKED,
                    format!("{} task {} panicked", phase, index),
                )
                .with_source(e)
            })?;

        match outcome {
            Ok(output) => return Ok((output, attempt as usize)),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!(
                    "{} task {} failed (attempt {}/{}): {}",
                    phase,
                    index,
                    attempt,
                    max_retries + 1,
                    e
                );
            }
            Err(e) if e.is_retryable() => {
                return Err(e.with_context(format!(
                    "{} task {} failed after {} attempts",
                    phase,
                    index,
                    attempt + 1
                )));
            }
            Err(e) => return Err(e),
        }
    }
}
