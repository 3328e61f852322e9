pub mod modifiers;
pub mod stage;
pub mod tables;

use serde::{Deserialize, Serialize};

pub use modifiers::{AdjustedStage, BoostWindow, Modifiers};
pub use stage::{stage_outcome, StageOutcome};
pub use tables::{
    base_cost, check_level, check_price, check_tables, destruction_probability,
    max_tier_for_level, success_probability, tier_table, TierRow, TierSystem, EXTENDED_MAX_TIER,
    LEGACY_MAX_TIER, MAX_ITEM_LEVEL, MAX_MESO_PRICE,
};

use crate::error::{EngineError, ValidationError};
use crate::simulator::chain::{ChainStage, StageChain};

/// One item's star force goal: traverse `current_tier -> target_tier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StarForceRequest {
    pub item_level: u32,
    pub current_tier: u8,
    pub target_tier: u8,
    #[serde(default)]
    pub tier_system: TierSystem,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Meso charged per destruction to restore or replace the item.
    #[serde(default)]
    pub replacement_cost: u64,
}

impl StarForceRequest {
    pub fn new(item_level: u32, current_tier: u8, target_tier: u8, tier_system: TierSystem) -> Self {
        Self {
            item_level,
            current_tier,
            target_tier,
            tier_system,
            modifiers: Modifiers::default(),
            replacement_cost: 0,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Checks every request invariant. A zero-span request is valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let max = max_tier_for_level(self.item_level, self.tier_system)?;
        if self.target_tier < self.current_tier {
            return Err(ValidationError::TargetBelowCurrent {
                current: self.current_tier,
                target: self.target_tier,
            });
        }
        if self.target_tier > max {
            return Err(ValidationError::TargetAboveMaximum {
                target: self.target_tier,
                max,
                level: self.item_level,
            });
        }
        check_price("replacement_cost", self.replacement_cost)?;
        self.modifiers.validate()
    }

    /// Per-stage closed-form outcomes, lowest tier first.
    pub fn stage_outcomes(&self) -> Result<Vec<StageOutcome>, EngineError> {
        self.validate()?;
        (self.current_tier..self.target_tier)
            .map(|tier| {
                stage_outcome(
                    tier,
                    self.item_level,
                    self.tier_system,
                    &self.modifiers,
                    self.replacement_cost,
                )
            })
            .collect()
    }

    /// Lowers the request to the generic stage chain the simulator walks.
    pub fn to_chain(&self) -> Result<(StageChain, Vec<StageOutcome>), EngineError> {
        let outcomes = self.stage_outcomes()?;
        let stages = outcomes
            .iter()
            .map(|outcome| ChainStage {
                success: outcome.success_probability,
                destruction: outcome.destruction_probability,
                attempt_cost: outcome.attempt_cost,
                destruction_cost: self.replacement_cost,
                first_roll_shared: false,
            })
            .collect();
        let expected_cost = outcomes.iter().map(|outcome| outcome.expected_cost).sum();
        let expected_destructions = outcomes.iter().map(|o| o.expected_destructions).sum();
        let expected_attempts = outcomes.iter().map(|o| o.expected_attempts).sum();
        Ok((
            StageChain {
                stages,
                expected_cost,
                expected_destructions,
                expected_attempts,
            },
            outcomes,
        ))
    }
}
