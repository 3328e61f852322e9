//! Multi-item planning: per-item goals simulated once, then aggregated into a
//! portfolio whose percentiles come from joint trials.

pub mod load;
pub mod portfolio;
pub mod report;
pub mod validate;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use load::{load_batch_file, BatchFile, LoadError};
pub use portfolio::Portfolio;

use crate::error::{EngineError, ValidationError};
use crate::parallel::map_in_batches;
use crate::potential::{
    simulate_potential, CubeChoice, PotentialRequest, PotentialResult, PotentialSimulation,
    PotentialTier,
};
use crate::simulator::rng::stream_seed;
use crate::simulator::{
    simulate_star_force, AggregateResult, Simulation, SimulationOptions, DEFAULT_MAX_TRIALS,
};
use crate::starforce::{Modifiers, StarForceRequest, TierSystem};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarForceGoal {
    pub current_tier: u8,
    pub target_tier: u8,
    #[serde(default)]
    pub tier_system: TierSystem,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub replacement_cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialGoal {
    pub current_tier: PotentialTier,
    pub target_tier: PotentialTier,
    #[serde(default)]
    pub prime_lines: Option<u8>,
    #[serde(default)]
    pub cube: CubeChoice,
    #[serde(default)]
    pub cube_cost: Option<u64>,
}

fn default_included() -> bool {
    true
}

/// One piece of equipment in a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub level: u32,
    #[serde(default = "default_included")]
    pub included: bool,
    #[serde(default)]
    pub star_force: Option<StarForceGoal>,
    #[serde(default)]
    pub potential: Option<PotentialGoal>,
}

impl ItemDescriptor {
    pub fn new(id: impl Into<String>, level: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            level,
            included: true,
            star_force: None,
            potential: None,
        }
    }

    pub fn with_star_force(mut self, goal: StarForceGoal) -> Self {
        self.star_force = Some(goal);
        self
    }

    pub fn with_potential(mut self, goal: PotentialGoal) -> Self {
        self.potential = Some(goal);
        self
    }

    pub fn star_force_request(&self) -> Option<StarForceRequest> {
        self.star_force.map(|goal| StarForceRequest {
            item_level: self.level,
            current_tier: goal.current_tier,
            target_tier: goal.target_tier,
            tier_system: goal.tier_system,
            modifiers: goal.modifiers,
            replacement_cost: goal.replacement_cost,
        })
    }

    pub fn potential_request(&self) -> Option<PotentialRequest> {
        self.potential.map(|goal| PotentialRequest {
            item_level: self.level,
            current_tier: goal.current_tier,
            target_tier: goal.target_tier,
            prime_lines: goal.prime_lines,
            cube: goal.cube,
            cube_cost: goal.cube_cost,
        })
    }

    /// Checks the descriptor and every goal it carries.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyItemId);
        }
        if self.star_force.is_none() && self.potential.is_none() {
            return Err(ValidationError::EmptyItemGoal(self.id.clone()));
        }
        let checks = [
            self.star_force_request().map(|request| request.validate()),
            self.potential_request().map(|request| request.validate()),
        ];
        for check in checks.into_iter().flatten() {
            check.map_err(|err| err.for_item(&self.id))?;
        }
        Ok(())
    }
}

/// Per-batch overrides of the engine's simulation defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub trials: Option<usize>,
    pub seed: Option<u64>,
    pub percentiles: Option<Vec<f64>>,
    pub trial_budget: Option<usize>,
}

impl BatchOptions {
    pub fn resolve(&self, defaults: &SimulationOptions) -> SimulationOptions {
        SimulationOptions {
            trials: self.trials.unwrap_or(defaults.trials),
            seed: self.seed.unwrap_or(defaults.seed),
            percentiles: self
                .percentiles
                .clone()
                .unwrap_or_else(|| defaults.percentiles.clone()),
            trial_budget: self.trial_budget.or(defaults.trial_budget),
            parallel: defaults.parallel,
        }
    }
}

/// Simulations for one item, kept so the portfolio can re-aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSimulation {
    pub id: String,
    pub name: Option<String>,
    pub included: bool,
    pub star_force: Option<Simulation>,
    pub potential: Option<PotentialSimulation>,
}

impl ItemSimulation {
    pub fn simulations(&self) -> impl Iterator<Item = &Simulation> {
        self.star_force
            .iter()
            .chain(self.potential.iter().map(|potential| &potential.simulation))
    }

    pub fn total(&self, trials: usize, percentiles: &[f64]) -> AggregateResult {
        Simulation::joint(self.simulations(), trials, percentiles)
    }

    pub fn to_result(&self, trials: usize, percentiles: &[f64]) -> ItemResult {
        ItemResult {
            id: self.id.clone(),
            name: self.name.clone(),
            included: self.included,
            star_force: self.star_force.as_ref().map(|sim| sim.result.clone()),
            potential: self.potential.as_ref().map(PotentialSimulation::to_result),
            total: self.total(trials, percentiles),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemResult {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub included: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_force: Option<AggregateResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential: Option<PotentialResult>,
    pub total: AggregateResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub items: Vec<ItemResult>,
    pub portfolio: AggregateResult,
}

/// Rejects empty, duplicate or invalid items before any simulation runs.
pub fn validate_items(items: &[ItemDescriptor]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for item in items {
        item.validate()?;
        if !seen.insert(item.id.as_str()) {
            return Err(ValidationError::DuplicateItemId(item.id.clone()));
        }
    }
    Ok(())
}

/// Number of progress checkpoints in a batch run.
pub const PROGRESS_BATCH_COUNT: usize = 10;

/// Source of per-goal simulations. The engine implements it with a memo
/// cache in front; [Uncached] runs every goal directly.
pub trait GoalSimulator: Sync {
    fn max_trials(&self) -> usize;

    fn star_force(
        &self,
        request: &StarForceRequest,
        options: &SimulationOptions,
    ) -> Result<Simulation, EngineError>;

    fn potential(
        &self,
        request: &PotentialRequest,
        options: &SimulationOptions,
    ) -> Result<PotentialSimulation, EngineError>;
}

#[derive(Debug, Clone, Copy)]
pub struct Uncached {
    pub max_trials: usize,
}

impl Default for Uncached {
    fn default() -> Self {
        Self {
            max_trials: DEFAULT_MAX_TRIALS,
        }
    }
}

impl GoalSimulator for Uncached {
    fn max_trials(&self) -> usize {
        self.max_trials
    }

    fn star_force(
        &self,
        request: &StarForceRequest,
        options: &SimulationOptions,
    ) -> Result<Simulation, EngineError> {
        simulate_star_force(request, options, self.max_trials)
    }

    fn potential(
        &self,
        request: &PotentialRequest,
        options: &SimulationOptions,
    ) -> Result<PotentialSimulation, EngineError> {
        simulate_potential(request, options, self.max_trials)
    }
}

fn simulate_item<S: GoalSimulator + ?Sized>(
    simulator: &S,
    item: &ItemDescriptor,
    options: &SimulationOptions,
) -> Result<ItemSimulation, EngineError> {
    let tag = |err: EngineError| match err {
        EngineError::Validation(err) => EngineError::Validation(err.for_item(&item.id)),
        other => other,
    };
    let star_force = item
        .star_force_request()
        .map(|request| {
            let seed = stream_seed(options.seed, &format!("{}/star_force", item.id));
            simulator.star_force(&request, &options.with_seed(seed))
        })
        .transpose()
        .map_err(tag)?;
    let potential = item
        .potential_request()
        .map(|request| {
            let seed = stream_seed(options.seed, &format!("{}/potential", item.id));
            simulator.potential(&request, &options.with_seed(seed))
        })
        .transpose()
        .map_err(tag)?;
    tracing::debug!(
        target: "starforce::batch",
        item = %item.id,
        star_force = star_force.is_some(),
        potential = potential.is_some(),
        "simulated item"
    );
    Ok(ItemSimulation {
        id: item.id.clone(),
        name: item.name.clone(),
        included: item.included,
        star_force,
        potential,
    })
}

/// Simulates every item once and returns the portfolio that owns the
/// samples. Items run in parallel within each progress batch, and
/// `on_progress(done, total)` is called between batches.
pub fn simulate_batch_with<S, P>(
    simulator: &S,
    items: &[ItemDescriptor],
    options: &SimulationOptions,
    on_progress: P,
) -> Result<Portfolio, EngineError>
where
    S: GoalSimulator + ?Sized,
    P: FnMut(usize, usize),
{
    validate_items(items)?;
    options.validate(simulator.max_trials())?;
    let simulations = map_in_batches(
        items,
        PROGRESS_BATCH_COUNT,
        |item| simulate_item(simulator, item, options),
        on_progress,
    )?;
    let portfolio = Portfolio::new(
        simulations,
        options.effective_trials(),
        options.percentiles.clone(),
    );
    tracing::info!(
        target: "starforce::batch",
        items = items.len(),
        trials = portfolio.trials(),
        "batch simulated"
    );
    Ok(portfolio)
}

pub fn simulate_batch(
    items: &[ItemDescriptor],
    options: &SimulationOptions,
    max_trials: usize,
) -> Result<Portfolio, EngineError> {
    simulate_batch_with(&Uncached { max_trials }, items, options, |_, _| {})
}

/// Per-item results in input order plus portfolio totals over included items.
pub fn calculate_batch(
    items: &[ItemDescriptor],
    options: &BatchOptions,
) -> Result<BatchResult, EngineError> {
    let options = options.resolve(&SimulationOptions::default());
    simulate_batch(items, &options, DEFAULT_MAX_TRIALS).map(|portfolio| portfolio.result())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star_force(current: u8, target: u8) -> StarForceGoal {
        StarForceGoal {
            current_tier: current,
            target_tier: target,
            tier_system: TierSystem::Legacy,
            modifiers: Modifiers::default(),
            replacement_cost: 0,
        }
    }

    fn options() -> BatchOptions {
        BatchOptions {
            trials: Some(100),
            ..BatchOptions::default()
        }
    }

    #[test]
    fn portfolio_expectation_is_sum_of_included_items() {
        let items = vec![
            ItemDescriptor::new("hat", 150).with_star_force(star_force(0, 12)),
            ItemDescriptor::new("top", 160).with_star_force(star_force(10, 17)),
            ItemDescriptor {
                included: false,
                ..ItemDescriptor::new("shoes", 160).with_star_force(star_force(0, 15))
            },
        ];
        let result = calculate_batch(&items, &options()).unwrap();
        let ids: Vec<_> = result.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["hat", "top", "shoes"]);
        let included: u64 = result
            .items
            .iter()
            .filter(|item| item.included)
            .map(|item| item.total.expected_cost)
            .sum();
        assert_eq!(result.portfolio.expected_cost, included);
    }

    #[test]
    fn item_total_combines_both_goals() {
        let item = ItemDescriptor::new("ring", 150)
            .with_star_force(star_force(0, 10))
            .with_potential(PotentialGoal {
                current_tier: PotentialTier::Rare,
                target_tier: PotentialTier::Epic,
                prime_lines: None,
                cube: CubeChoice::default(),
                cube_cost: None,
            });
        let result = calculate_batch(&[item], &options()).unwrap();
        let ring = &result.items[0];
        let star = ring.star_force.as_ref().unwrap().expected_cost;
        let cubes = ring.potential.as_ref().unwrap().result.expected_cost;
        assert_eq!(ring.total.expected_cost, star + cubes);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let items = vec![
            ItemDescriptor::new("hat", 150).with_star_force(star_force(0, 5)),
            ItemDescriptor::new("hat", 150).with_star_force(star_force(0, 5)),
        ];
        assert_eq!(
            calculate_batch(&items, &options()).unwrap_err(),
            EngineError::Validation(ValidationError::DuplicateItemId("hat".into()))
        );
    }

    #[test]
    fn item_errors_name_the_item() {
        let items = vec![ItemDescriptor::new("belt", 160).with_star_force(star_force(0, 24))];
        let err = calculate_batch(&items, &options()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "item 'belt': target tier 24 exceeds maximum 23 for item level 160"
        );
    }

    #[test]
    fn items_without_goals_are_rejected() {
        let items = vec![ItemDescriptor::new("cape", 150)];
        assert_eq!(
            validate_items(&items),
            Err(ValidationError::EmptyItemGoal("cape".into()))
        );
        assert_eq!(
            validate_items(&[ItemDescriptor::new(" ", 150).with_star_force(star_force(0, 1))]),
            Err(ValidationError::EmptyItemId)
        );
    }

    #[test]
    fn empty_batch_has_zero_portfolio() {
        let result = calculate_batch(&[], &options()).unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.portfolio.expected_cost, 0);
        assert!(result.portfolio.percentiles.iter().all(|p| p.cost == 0));
    }

    #[test]
    fn options_fall_back_to_defaults() {
        let defaults = SimulationOptions::default();
        let resolved = BatchOptions {
            seed: Some(42),
            ..BatchOptions::default()
        }
        .resolve(&defaults);
        assert_eq!(resolved.seed, 42);
        assert_eq!(resolved.trials, defaults.trials);
        assert_eq!(resolved.percentiles, defaults.percentiles);
    }
}
