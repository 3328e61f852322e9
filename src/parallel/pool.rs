//! Rayon thread pool configuration for calculation workloads.
//!
//! Use [WorkerPool::install] to run Monte Carlo trials with a fixed number of
//! threads, or rely on Rayon's default (all CPU cores).

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};

/// Configures how many worker threads run calculations.
#[derive(Debug, Clone, Default)]
pub struct WorkerPool {
    /// Requested worker threads. If 0, use the Rayon global pool.
    pub workers: usize,
    pool: Option<Arc<ThreadPool>>,
}

impl WorkerPool {
    /// Use all available CPU cores (Rayon default).
    pub fn default_workers() -> Self {
        Self::default()
    }

    /// Use exactly `n` worker threads. Falls back to the global pool when the
    /// dedicated pool cannot be built.
    pub fn with_workers(n: usize) -> Self {
        if n == 0 {
            return Self::default();
        }
        match ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|index| format!("starforce-worker-{index}"))
            .build()
        {
            Ok(pool) => Self {
                workers: n,
                pool: Some(Arc::new(pool)),
            },
            Err(err) => {
                tracing::warn!(
                    target: "starforce::parallel",
                    workers = n,
                    error = %err,
                    "unable to build worker pool, using global pool"
                );
                Self::default()
            }
        }
    }

    /// Threads actually available to [install](WorkerPool::install).
    pub fn current_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Run a closure on this pool. Parallel iterators inside it use the
    /// pool's threads.
    pub fn install<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(f),
            None => f(),
        }
    }

    /// Run a closure in the background without waiting for it.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.pool {
            Some(pool) => pool.spawn(f),
            None => rayon::spawn(f),
        }
    }
}
