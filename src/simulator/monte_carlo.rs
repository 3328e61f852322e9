//! Trial walks over a [StageChain] for percentile estimation.
//!
//! Each trial draws from its own SplitMix64 stream seeded by `(seed, index)`,
//! so the parallel run returns exactly the samples of the sequential run.

use rayon::prelude::*;
use serde::Serialize;

use crate::simulator::chain::{ChainStage, StageChain};
use crate::simulator::rng::Rng;

/// Outcome of one full walk through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TrialSample {
    pub cost: u64,
    pub attempts: u64,
    pub destructions: u64,
}

impl TrialSample {
    pub fn combine(self, other: TrialSample) -> TrialSample {
        TrialSample {
            cost: self.cost + other.cost,
            attempts: self.attempts + other.attempts,
            destructions: self.destructions + other.destructions,
        }
    }
}

pub fn run_trials(chain: &StageChain, trials: usize, seed: u64) -> Vec<TrialSample> {
    run_trials_with_parallelism(chain, trials, seed, false)
}

/// Like [run_trials] but spreads trials across the rayon pool. Sample order
/// matches the sequential run.
pub fn run_trials_parallel(chain: &StageChain, trials: usize, seed: u64) -> Vec<TrialSample> {
    run_trials_with_parallelism(chain, trials, seed, true)
}

fn run_trials_with_parallelism(
    chain: &StageChain,
    trials: usize,
    seed: u64,
    parallel: bool,
) -> Vec<TrialSample> {
    if chain.is_empty() {
        return vec![TrialSample::default(); trials];
    }
    let run_one = |index: usize| {
        let mut rng = Rng::for_trial(seed, index as u64);
        walk_chain(&chain.stages, &mut rng)
    };
    if parallel {
        (0..trials).into_par_iter().map(run_one).collect()
    } else {
        (0..trials).map(run_one).collect()
    }
}

/// Walks every stage until it clears. `u < d` destroys, `u < d + p` clears,
/// anything else is a plain failure.
pub fn walk_chain(stages: &[ChainStage], rng: &mut Rng) -> TrialSample {
    let mut sample = TrialSample::default();
    for (index, stage) in stages.iter().enumerate() {
        if stage.first_roll_shared && index > 0 && rng.next_f64() < stage.success {
            continue;
        }
        loop {
            sample.attempts += 1;
            sample.cost += stage.attempt_cost;
            let u = rng.next_f64();
            if u < stage.destruction {
                sample.destructions += 1;
                sample.cost += stage.destruction_cost;
            } else if u < stage.destruction + stage.success {
                break;
            }
        }
    }
    sample
}
