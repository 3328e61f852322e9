//! Single-request simulator: exact expectations from the stage chain plus
//! Monte Carlo percentiles.

pub mod chain;
pub mod monte_carlo;
pub mod percentile;
pub mod rng;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ValidationError};
use crate::simulator::chain::StageChain;
use crate::simulator::monte_carlo::{run_trials, run_trials_parallel, TrialSample};
use crate::simulator::percentile::{percentile_outcomes, PercentileOutcome, DEFAULT_PERCENTILES};
use crate::starforce::{StageOutcome, StarForceRequest};

pub const DEFAULT_TRIALS: usize = 300;
pub const DEFAULT_MAX_TRIALS: usize = 100_000;

/// Monte Carlo settings for one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub trials: usize,
    pub seed: u64,
    pub percentiles: Vec<f64>,
    /// Caller-imposed ceiling on the trial count, for tight latency budgets.
    pub trial_budget: Option<usize>,
    #[serde(skip)]
    pub parallel: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: 0,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            trial_budget: None,
            parallel: true,
        }
    }
}

impl SimulationOptions {
    /// Trial count after applying the caller's budget.
    pub fn effective_trials(&self) -> usize {
        match self.trial_budget {
            Some(budget) => self.trials.min(budget.max(1)),
            None => self.trials,
        }
    }

    pub fn validate(&self, max_trials: usize) -> Result<(), ValidationError> {
        if self.trials == 0 || self.trials > max_trials {
            return Err(ValidationError::TrialCount {
                requested: self.trials,
                max: max_trials,
            });
        }
        if let Some(bad) = self
            .percentiles
            .iter()
            .copied()
            .find(|p| !(p.is_finite() && *p > 0.0 && *p <= 100.0))
        {
            return Err(ValidationError::Percentile(bad));
        }
        Ok(())
    }

    pub fn with_seed(&self, seed: u64) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}

/// Result of one request, or the portfolio sum of a batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateResult {
    pub expected_cost: u64,
    pub expected_destructions: f64,
    pub expected_attempts: f64,
    pub trials: usize,
    pub percentiles: Vec<PercentileOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageOutcome>,
}

impl AggregateResult {
    /// Cost at percentile `p`, when it was requested.
    pub fn percentile_cost(&self, p: f64) -> Option<u64> {
        self.percentiles
            .iter()
            .find(|outcome| outcome.percentile == p)
            .map(|outcome| outcome.cost)
    }
}

/// In-process record of a simulation. Keeps the trial samples in generation
/// order so portfolios can be re-sampled jointly without re-simulating.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Simulation {
    pub result: AggregateResult,
    pub samples: Vec<TrialSample>,
}

impl Simulation {
    pub fn from_chain(
        chain: &StageChain,
        stages: Vec<StageOutcome>,
        options: &SimulationOptions,
    ) -> Self {
        let trials = options.effective_trials();
        let samples = if options.parallel {
            run_trials_parallel(chain, trials, options.seed)
        } else {
            run_trials(chain, trials, options.seed)
        };
        let percentiles = percentile_outcomes(&samples, &options.percentiles);
        Self {
            result: AggregateResult {
                expected_cost: chain.expected_cost,
                expected_destructions: chain.expected_destructions,
                expected_attempts: chain.expected_attempts,
                trials,
                percentiles,
                stages,
            },
            samples,
        }
    }

    /// Sums expectations and combines samples trial by trial. Every input
    /// must have been run with the same trial count on independent streams.
    pub fn joint<'a, I>(simulations: I, trials: usize, percentiles: &[f64]) -> AggregateResult
    where
        I: IntoIterator<Item = &'a Simulation>,
    {
        let mut result = AggregateResult {
            trials,
            ..AggregateResult::default()
        };
        let mut samples = vec![TrialSample::default(); trials];
        for simulation in simulations {
            result.expected_cost += simulation.result.expected_cost;
            result.expected_destructions += simulation.result.expected_destructions;
            result.expected_attempts += simulation.result.expected_attempts;
            for (total, sample) in samples.iter_mut().zip(&simulation.samples) {
                *total = total.combine(*sample);
            }
        }
        result.percentiles = percentile_outcomes(&samples, percentiles);
        result
    }
}

/// Validates and simulates one star force request.
pub fn simulate_star_force(
    request: &StarForceRequest,
    options: &SimulationOptions,
    max_trials: usize,
) -> Result<Simulation, EngineError> {
    options.validate(max_trials)?;
    let (chain, stages) = request.to_chain()?;
    Ok(Simulation::from_chain(&chain, stages, options))
}

/// `calculateStage`: expected cost, expected destructions and percentile
/// outcomes for one item, or the constraint the request violates.
pub fn calculate_stage(
    request: &StarForceRequest,
    options: &SimulationOptions,
) -> Result<AggregateResult, EngineError> {
    simulate_star_force(request, options, DEFAULT_MAX_TRIALS).map(|simulation| simulation.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starforce::TierSystem;

    #[test]
    fn budget_caps_trial_count() {
        let options = SimulationOptions {
            trials: 1_000,
            trial_budget: Some(200),
            ..SimulationOptions::default()
        };
        assert_eq!(options.effective_trials(), 200);
        let zero_budget = SimulationOptions {
            trial_budget: Some(0),
            ..options
        };
        assert_eq!(zero_budget.effective_trials(), 1);
    }

    #[test]
    fn options_reject_bad_trials_and_percentiles() {
        let zero = SimulationOptions {
            trials: 0,
            ..SimulationOptions::default()
        };
        assert!(matches!(
            zero.validate(DEFAULT_MAX_TRIALS),
            Err(ValidationError::TrialCount { requested: 0, .. })
        ));
        let bad_percentile = SimulationOptions {
            percentiles: vec![50.0, 101.0],
            ..SimulationOptions::default()
        };
        assert_eq!(
            bad_percentile.validate(DEFAULT_MAX_TRIALS),
            Err(ValidationError::Percentile(101.0))
        );
    }

    #[test]
    fn result_reports_requested_percentiles() {
        let request = StarForceRequest::new(150, 10, 15, TierSystem::Legacy);
        let result = calculate_stage(&request, &SimulationOptions::default()).unwrap();
        assert_eq!(result.trials, DEFAULT_TRIALS);
        assert!(result.percentile_cost(50.0).is_some());
        assert!(result.percentile_cost(95.0).is_some());
        assert!(result.percentile_cost(99.0).is_none());
        assert!(result.percentile_cost(50.0) <= result.percentile_cost(95.0));
    }

    #[test]
    fn sequential_and_parallel_runs_agree() {
        let request = StarForceRequest::new(160, 12, 18, TierSystem::Legacy);
        let parallel = SimulationOptions::default();
        let sequential = SimulationOptions {
            parallel: false,
            ..SimulationOptions::default()
        };
        assert_eq!(
            calculate_stage(&request, &parallel).unwrap(),
            calculate_stage(&request, &sequential).unwrap()
        );
    }

    #[test]
    fn joint_sums_expectations_and_samples() {
        let options = SimulationOptions {
            trials: 64,
            ..SimulationOptions::default()
        };
        let a = simulate_star_force(
            &StarForceRequest::new(150, 0, 10, TierSystem::Legacy),
            &options,
            DEFAULT_MAX_TRIALS,
        )
        .unwrap();
        let b = simulate_star_force(
            &StarForceRequest::new(140, 5, 12, TierSystem::Legacy),
            &options.with_seed(1),
            DEFAULT_MAX_TRIALS,
        )
        .unwrap();
        let joint = Simulation::joint([&a, &b], 64, &[100.0]);
        assert_eq!(
            joint.expected_cost,
            a.result.expected_cost + b.result.expected_cost
        );
        let max_combined = a
            .samples
            .iter()
            .zip(&b.samples)
            .map(|(x, y)| x.cost + y.cost)
            .max()
            .unwrap();
        assert_eq!(joint.percentile_cost(100.0), Some(max_combined));
    }
}
