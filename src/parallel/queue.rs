//! Task submission: run a calculation on the worker pool and hand back a
//! handle that can be awaited or waited on.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::parallel::pool::WorkerPool;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("calculation ended without producing a result")]
    Abandoned,
}

/// Result handle for a submitted calculation. Dropping it discards the result;
/// work that has not started yet is skipped.
#[derive(Debug)]
pub struct PendingCalculation<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> PendingCalculation<T> {
    /// Blocks the current thread until the result arrives. Must not be called
    /// from inside an async runtime; await the handle there instead.
    pub fn wait(self) -> Result<T, QueueError> {
        self.receiver.blocking_recv().map_err(|_| QueueError::Abandoned)
    }
}

impl<T> Future for PendingCalculation<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map_err(|_| QueueError::Abandoned)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalculationQueue {
    pool: WorkerPool,
}

impl CalculationQueue {
    pub fn new(pool: WorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn submit<T, F>(&self, task: F) -> PendingCalculation<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.pool.spawn(move || {
            if sender.is_closed() {
                tracing::debug!(target: "starforce::queue", "calculation discarded before start");
                return;
            }
            match panic::catch_unwind(AssertUnwindSafe(task)) {
                Ok(result) => {
                    let _ = sender.send(result);
                }
                Err(_) => {
                    tracing::warn!(target: "starforce::queue", "calculation panicked");
                }
            }
        });
        PendingCalculation { receiver }
    }

    /// Runs `task` in the background with nobody waiting on it.
    pub fn detach<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(move || {
            if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                tracing::warn!(target: "starforce::queue", "background calculation panicked");
            }
        });
    }
}

/// Awaits every handle, preserving submission order.
pub async fn join_all<T>(pending: Vec<PendingCalculation<T>>) -> Vec<Result<T, QueueError>> {
    futures_util::future::join_all(pending).await
}
