use crate::batch::{BatchResult, ItemSimulation};
use crate::simulator::{AggregateResult, Simulation};

/// Simulated items of one plan. Toggling inclusion re-aggregates the stored
/// samples; nothing is simulated again.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    items: Vec<ItemSimulation>,
    trials: usize,
    percentiles: Vec<f64>,
}

impl Portfolio {
    pub fn new(items: Vec<ItemSimulation>, trials: usize, percentiles: Vec<f64>) -> Self {
        Self {
            items,
            trials,
            percentiles,
        }
    }

    pub fn items(&self) -> &[ItemSimulation] {
        &self.items
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Returns false when no item has `id`.
    pub fn set_included(&mut self, id: &str, included: bool) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.included = included;
                true
            }
            None => false,
        }
    }

    /// Totals over included items. Percentiles come from summing trial `i` of
    /// every included goal.
    pub fn summary(&self) -> AggregateResult {
        let simulations = self
            .items
            .iter()
            .filter(|item| item.included)
            .flat_map(ItemSimulation::simulations);
        let summary: AggregateResult =
            Simulation::joint(simulations, self.trials, &self.percentiles);
        tracing::debug!(
            target: "starforce::batch",
            items = self.items.len(),
            included = self.items.iter().filter(|item| item.included).count(),
            expected_cost = summary.expected_cost,
            "portfolio summary"
        );
        summary
    }

    pub fn result(&self) -> BatchResult {
        BatchResult {
            items: self
                .items
                .iter()
                .map(|item| item.to_result(self.trials, &self.percentiles))
                .collect(),
            portfolio: self.summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::batch::{simulate_batch, ItemDescriptor, StarForceGoal};
    use crate::simulator::{SimulationOptions, DEFAULT_MAX_TRIALS};
    use crate::starforce::{Modifiers, TierSystem};

    fn goal(current: u8, target: u8) -> StarForceGoal {
        StarForceGoal {
            current_tier: current,
            target_tier: target,
            tier_system: TierSystem::Legacy,
            modifiers: Modifiers::default(),
            replacement_cost: 0,
        }
    }

    fn portfolio() -> super::Portfolio {
        let items = vec![
            ItemDescriptor::new("weapon", 200).with_star_force(goal(12, 17)),
            ItemDescriptor::new("gloves", 150).with_star_force(goal(0, 15)),
        ];
        let options = SimulationOptions {
            trials: 150,
            seed: 11,
            ..SimulationOptions::default()
        };
        simulate_batch(&items, &options, DEFAULT_MAX_TRIALS).unwrap()
    }

    #[test]
    fn excluding_an_item_removes_its_expectation() {
        let mut portfolio = portfolio();
        let full = portfolio.summary();
        let gloves = portfolio.items()[1].total(150, &[50.0]).expected_cost;

        assert!(portfolio.set_included("gloves", false));
        let partial = portfolio.summary();
        assert_eq!(partial.expected_cost, full.expected_cost - gloves);

        assert!(portfolio.set_included("gloves", true));
        assert_eq!(portfolio.summary(), full);
    }

    #[test]
    fn unknown_item_is_reported() {
        let mut portfolio = portfolio();
        assert!(!portfolio.set_included("cape", false));
    }

    #[test]
    fn excluded_items_still_report_their_own_totals() {
        let mut portfolio = portfolio();
        portfolio.set_included("weapon", false);
        let result = portfolio.result();
        assert!(!result.items[0].included);
        assert!(result.items[0].total.expected_cost > 0);
        assert_eq!(
            result.portfolio.expected_cost,
            result.items[1].total.expected_cost
        );
    }

    #[test]
    fn joint_percentiles_are_bounded_by_marginals() {
        let portfolio = portfolio();
        let summary = portfolio.summary();
        let marginal = |p: f64| -> Vec<u64> {
            portfolio
                .items()
                .iter()
                .map(|item| item.total(150, &[p]).percentiles[0].cost)
                .collect()
        };
        let p95 = marginal(95.0);
        assert!(summary.percentile_cost(95.0).unwrap() >= *p95.iter().max().unwrap());

        let worst = marginal(100.0);
        let joint_worst = super::Simulation::joint(
            portfolio.items().iter().flat_map(super::ItemSimulation::simulations),
            150,
            &[100.0],
        );
        assert!(joint_worst.percentile_cost(100.0).unwrap() <= worst.iter().sum::<u64>());
    }
}
