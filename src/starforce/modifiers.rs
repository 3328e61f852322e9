//! Request modifiers and the fixed order in which they adjust a stage.
//!
//! Precedence, applied per stage:
//! 1. guaranteed milestone: success 1, destruction 0, nothing else applies;
//! 2. destruction prevention: destruction 0 when the tier is inside the
//!    system's prevention window, no-op otherwise;
//! 3. success boosts: catch bonus, then the boost window, multiplicatively;
//!    success is capped at 1 and destruction at `1 - success`;
//! 4. cost: prevention surcharge, then the flat discount.

use serde::{Deserialize, Serialize};

use crate::error::{ComputationError, ValidationError};
use crate::starforce::tables::{TierSystem, MILESTONE_TIERS};

pub const CATCH_MULTIPLIER: f64 = 1.05;
pub const PREVENTION_COST_MULTIPLIER: u64 = 2;

/// Flat discount as an exact ratio so discounted integer costs stay exact.
pub const DISCOUNT_NUMERATOR: u64 = 7;
pub const DISCOUNT_DENOMINATOR: u64 = 10;

/// Success multiplier active over a contiguous range of tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostWindow {
    pub from_tier: u8,
    pub to_tier: u8,
    pub multiplier: f64,
}

impl Default for BoostWindow {
    fn default() -> Self {
        Self {
            from_tier: 0,
            to_tier: 9,
            multiplier: 1.10,
        }
    }
}

impl BoostWindow {
    pub fn contains(&self, tier: u8) -> bool {
        (self.from_tier..=self.to_tier).contains(&tier)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from_tier > self.to_tier || !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ValidationError::BoostWindow {
                from: self.from_tier,
                to: self.to_tier,
                multiplier: self.multiplier,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub cost_discount_30: bool,
    pub catch_bonus: bool,
    pub boosted_success_window: Option<BoostWindow>,
    pub prevent_destruction: bool,
    pub guaranteed_milestone: bool,
}

/// Probabilities and cost multipliers for one stage after every modifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedStage {
    pub success: f64,
    pub destruction: f64,
    pub prevention_applied: bool,
    pub milestone: bool,
    /// Surcharge applied to the base cost before any discount.
    pub cost_multiplier: u64,
    pub discounted: bool,
}

impl Modifiers {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.boosted_success_window {
            Some(window) => window.validate(),
            None => Ok(()),
        }
    }

    /// Applies the precedence order to the raw table values of one stage.
    pub fn adjust(
        &self,
        tier: u8,
        system: TierSystem,
        base_success: f64,
        base_destruction: f64,
    ) -> Result<AdjustedStage, ComputationError> {
        check_probability(tier, "base success", base_success)?;
        check_probability(tier, "base destruction", base_destruction)?;
        if base_success + base_destruction > 1.0 + f64::EPSILON {
            return Err(ComputationError::ProbabilityMass {
                tier,
                success: base_success,
                destruction: base_destruction,
            });
        }

        let discounted = self.cost_discount_30;

        if self.guaranteed_milestone && MILESTONE_TIERS.contains(&tier) {
            return Ok(AdjustedStage {
                success: 1.0,
                destruction: 0.0,
                prevention_applied: false,
                milestone: true,
                cost_multiplier: 1,
                discounted,
            });
        }

        let prevention_applied = self.prevent_destruction && system.prevention_eligible(tier);
        let mut destruction = if prevention_applied { 0.0 } else { base_destruction };

        let mut success = base_success;
        if self.catch_bonus {
            success *= CATCH_MULTIPLIER;
        }
        if let Some(window) = self.boosted_success_window.filter(|w| w.contains(tier)) {
            success *= window.multiplier;
        }
        success = success.min(1.0);
        destruction = destruction.min(1.0 - success);

        check_probability(tier, "success", success)?;
        check_probability(tier, "destruction", destruction)?;
        if success == 0.0 {
            return Err(ComputationError::Unreachable { tier });
        }

        Ok(AdjustedStage {
            success,
            destruction,
            prevention_applied,
            milestone: false,
            cost_multiplier: if prevention_applied {
                PREVENTION_COST_MULTIPLIER
            } else {
                1
            },
            discounted,
        })
    }
}

fn check_probability(tier: u8, name: &'static str, value: f64) -> Result<(), ComputationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ComputationError::ProbabilityOutOfRange { tier, name, value })
    }
}

/// Applies the flat discount to an integer cost. The cost must divide evenly.
pub fn apply_discount(value: u64) -> Result<u64, ComputationError> {
    if value % DISCOUNT_DENOMINATOR != 0 {
        return Err(ComputationError::Indivisible {
            value,
            denominator: DISCOUNT_DENOMINATOR,
        });
    }
    Ok(value / DISCOUNT_DENOMINATOR * DISCOUNT_NUMERATOR)
}
