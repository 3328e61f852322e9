//! Batch distribution for parallel simulation.
//!
//! Splits work into batches so long runs can report progress between them.
//! Each batch still runs in parallel on the worker pool.

use rayon::prelude::*;

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
///
/// # Example
/// ```
/// # use starforce::parallel::batch_ranges;
/// let ranges = batch_ranges(100, 4);
/// assert_eq!(ranges, vec![(0, 25), (25, 50), (50, 75), (75, 100)]);
/// ```
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Maps `inputs` in parallel, one batch at a time, and calls
/// `on_progress(done, total)` after each batch. Stops at the first error.
/// Output order matches input order.
pub fn map_in_batches<T, R, E, F, P>(
    inputs: &[T],
    num_batches: usize,
    map: F,
    mut on_progress: P,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
    P: FnMut(usize, usize),
{
    let total = inputs.len();
    on_progress(0, total);
    let mut outputs = Vec::with_capacity(total);
    for (start, end) in batch_ranges(total, num_batches) {
        let batch = inputs[start..end]
            .par_iter()
            .map(&map)
            .collect::<Result<Vec<_>, E>>()?;
        outputs.extend(batch);
        on_progress(end, total);
    }
    Ok(outputs)
}
