pub mod batch;
pub mod cache;
pub mod pool;
pub mod queue;

pub use batch::{batch_ranges, map_in_batches};
pub use cache::{CacheStats, MemoCache};
pub use pool::WorkerPool;
pub use queue::{join_all, CalculationQueue, PendingCalculation, QueueError};
