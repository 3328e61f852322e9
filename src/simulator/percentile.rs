//! Empirical percentiles over trial samples (nearest-rank).

use serde::Serialize;

use crate::simulator::monte_carlo::TrialSample;

pub const DEFAULT_PERCENTILES: [f64; 3] = [50.0, 75.0, 95.0];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileOutcome {
    pub percentile: f64,
    pub cost: u64,
    pub destructions: u64,
}

/// Nearest-rank percentile of an ascending slice: the smallest value with at
/// least `p` percent of samples at or below it.
pub fn nearest_rank<T: Copy + Default>(sorted: &[T], percentile: f64) -> T {
    if sorted.is_empty() {
        return T::default();
    }
    let rank = (percentile * sorted.len() as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Cost and destruction percentiles, each ranked over its own marginal.
pub fn percentile_outcomes(samples: &[TrialSample], percentiles: &[f64]) -> Vec<PercentileOutcome> {
    let mut costs: Vec<u64> = samples.iter().map(|s| s.cost).collect();
    let mut destructions: Vec<u64> = samples.iter().map(|s| s.destructions).collect();
    costs.sort_unstable();
    destructions.sort_unstable();
    percentiles
        .iter()
        .map(|&percentile| PercentileOutcome {
            percentile,
            cost: nearest_rank(&costs, percentile),
            destructions: nearest_rank(&destructions, percentile),
        })
        .collect()
}
