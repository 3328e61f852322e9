//! The calculation engine: configuration, worker pool and memo caches behind
//! the `calculate_*` entry points used by the server and CLI.

use serde::Serialize;

use crate::batch::{
    simulate_batch_with, BatchOptions, BatchResult, GoalSimulator, ItemDescriptor, Portfolio,
};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::parallel::{CacheStats, CalculationQueue, MemoCache, WorkerPool};
use crate::potential::{
    simulate_potential, CubeChoice, PotentialRequest, PotentialResult, PotentialSimulation,
    PotentialTier,
};
use crate::simulator::{simulate_star_force, AggregateResult, Simulation, SimulationOptions};
use crate::starforce::{StarForceRequest, TierSystem};

/// Simulation settings as compared for cache lookups. Floats are keyed by
/// their bit patterns so equality is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OptionsKey {
    trials: usize,
    seed: u64,
    percentiles: Vec<u64>,
}

impl OptionsKey {
    fn new(options: &SimulationOptions) -> Self {
        Self {
            trials: options.effective_trials(),
            seed: options.seed,
            percentiles: options.percentiles.iter().map(|p| p.to_bits()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct StarForceKey {
    item_level: u32,
    current_tier: u8,
    target_tier: u8,
    tier_system: TierSystem,
    cost_discount_30: bool,
    catch_bonus: bool,
    boost_window: Option<(u8, u8, u64)>,
    prevent_destruction: bool,
    guaranteed_milestone: bool,
    replacement_cost: u64,
    options: OptionsKey,
}

impl StarForceKey {
    fn new(request: &StarForceRequest, options: &SimulationOptions) -> Self {
        let modifiers = &request.modifiers;
        Self {
            item_level: request.item_level,
            current_tier: request.current_tier,
            target_tier: request.target_tier,
            tier_system: request.tier_system,
            cost_discount_30: modifiers.cost_discount_30,
            catch_bonus: modifiers.catch_bonus,
            boost_window: modifiers
                .boosted_success_window
                .map(|w| (w.from_tier, w.to_tier, w.multiplier.to_bits())),
            prevent_destruction: modifiers.prevent_destruction,
            guaranteed_milestone: modifiers.guaranteed_milestone,
            replacement_cost: request.replacement_cost,
            options: OptionsKey::new(options),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PotentialKey {
    item_level: u32,
    current_tier: PotentialTier,
    target_tier: PotentialTier,
    prime_lines: Option<u8>,
    cube: CubeChoice,
    cube_cost: Option<u64>,
    options: OptionsKey,
}

impl PotentialKey {
    fn new(request: &PotentialRequest, options: &SimulationOptions) -> Self {
        Self {
            item_level: request.item_level,
            current_tier: request.current_tier,
            target_tier: request.target_tier,
            prime_lines: request.prime_lines,
            cube: request.cube,
            cube_cost: request.cube_cost,
            options: OptionsKey::new(options),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineCacheStats {
    pub star_force: CacheStats,
    pub potential: CacheStats,
}

#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    queue: CalculationQueue,
    star_force_cache: MemoCache<StarForceKey, Simulation>,
    potential_cache: MemoCache<PotentialKey, PotentialSimulation>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let pool = WorkerPool::with_workers(config.workers);
        tracing::debug!(
            target: "starforce::engine",
            workers = pool.current_threads(),
            cache_capacity = config.cache_capacity,
            "engine ready"
        );
        Self {
            queue: CalculationQueue::new(pool),
            star_force_cache: MemoCache::new(config.cache_capacity),
            potential_cache: MemoCache::new(config.cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn queue(&self) -> &CalculationQueue {
        &self.queue
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            star_force: self.star_force_cache.stats(),
            potential: self.potential_cache.stats(),
        }
    }

    /// Engine defaults with the caller's overrides applied.
    pub fn options(&self, overrides: &BatchOptions) -> SimulationOptions {
        overrides.resolve(&self.config.simulation_options())
    }

    pub fn calculate_stage(
        &self,
        request: &StarForceRequest,
        overrides: &BatchOptions,
    ) -> Result<AggregateResult, EngineError> {
        let options = self.options(overrides);
        self.queue
            .pool()
            .install(|| self.star_force(request, &options))
            .map(|simulation| simulation.result)
    }

    pub fn calculate_potential(
        &self,
        request: &PotentialRequest,
        overrides: &BatchOptions,
    ) -> Result<PotentialResult, EngineError> {
        let options = self.options(overrides);
        self.queue
            .pool()
            .install(|| self.potential(request, &options))
            .map(|simulation| simulation.to_result())
    }

    /// Simulates a plan and keeps the samples for later re-aggregation.
    pub fn portfolio(
        &self,
        items: &[ItemDescriptor],
        overrides: &BatchOptions,
    ) -> Result<Portfolio, EngineError> {
        self.portfolio_with_progress(items, overrides, |_, _| {})
    }

    pub fn portfolio_with_progress<P>(
        &self,
        items: &[ItemDescriptor],
        overrides: &BatchOptions,
        on_progress: P,
    ) -> Result<Portfolio, EngineError>
    where
        P: FnMut(usize, usize) + Send,
    {
        let options = self.options(overrides);
        self.queue
            .pool()
            .install(|| simulate_batch_with(self, items, &options, on_progress))
    }

    pub fn calculate_batch(
        &self,
        items: &[ItemDescriptor],
        overrides: &BatchOptions,
    ) -> Result<BatchResult, EngineError> {
        self.portfolio(items, overrides)
            .map(|portfolio| portfolio.result())
    }
}

impl GoalSimulator for Engine {
    fn max_trials(&self) -> usize {
        self.config.max_trials
    }

    fn star_force(
        &self,
        request: &StarForceRequest,
        options: &SimulationOptions,
    ) -> Result<Simulation, EngineError> {
        options.validate(self.config.max_trials)?;
        let key = StarForceKey::new(request, options);
        let simulation = self.star_force_cache.get_or_try_insert(key, || {
            tracing::debug!(
                target: "starforce::engine",
                level = request.item_level,
                from = request.current_tier,
                to = request.target_tier,
                system = %request.tier_system,
                trials = options.effective_trials(),
                "simulating star force"
            );
            simulate_star_force(request, options, self.config.max_trials)
        })?;
        Ok(Simulation::clone(&simulation))
    }

    fn potential(
        &self,
        request: &PotentialRequest,
        options: &SimulationOptions,
    ) -> Result<PotentialSimulation, EngineError> {
        options.validate(self.config.max_trials)?;
        let key = PotentialKey::new(request, options);
        let simulation = self.potential_cache.get_or_try_insert(key, || {
            tracing::debug!(
                target: "starforce::engine",
                level = request.item_level,
                from = %request.current_tier,
                to = %request.target_tier,
                "simulating potential"
            );
            simulate_potential(request, options, self.config.max_trials)
        })?;
        Ok(PotentialSimulation::clone(&simulation))
    }
}
