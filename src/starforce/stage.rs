//! Closed-form outcome of one `n -> n+1` stage.
//!
//! A stage's retry loop is geometric: every attempt independently succeeds
//! with `p`, so the expected attempt count is `1 / p`. Destruction does not
//! lose progress (the item is restored at its pre-destruction tier), which
//! keeps the Monte Carlo walk and this expectation on the same process.

use serde::Serialize;

use crate::error::EngineError;
use crate::starforce::modifiers::{apply_discount, Modifiers};
use crate::starforce::tables::{base_cost, destruction_probability, success_probability, TierSystem};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StageOutcome {
    pub tier: u8,
    /// Table cost per attempt before any modifier.
    pub base_cost: u64,
    /// Meso actually charged per attempt after surcharge and discount.
    pub attempt_cost: u64,
    pub success_probability: f64,
    pub destruction_probability: f64,
    pub expected_attempts: f64,
    pub expected_cost: u64,
    pub expected_destructions: f64,
    pub prevention_applied: bool,
    pub milestone: bool,
}

/// Rounds half-up to the nearest multiple of ten meso.
pub fn round_to_tens(value: f64) -> u64 {
    ((value / 10.0 + 0.5).floor() as u64) * 10
}

/// Rounds half-up to a whole meso.
pub fn round_half_up(value: f64) -> u64 {
    (value + 0.5).floor() as u64
}

pub fn stage_outcome(
    tier: u8,
    level: u32,
    system: TierSystem,
    modifiers: &Modifiers,
    replacement_cost: u64,
) -> Result<StageOutcome, EngineError> {
    let base = base_cost(tier, level, system)?;
    let adjusted = modifiers.adjust(
        tier,
        system,
        success_probability(tier, system)?,
        destruction_probability(tier, system)?,
    )?;

    let p = adjusted.success;
    let d = adjusted.destruction;
    let surcharged = base * adjusted.cost_multiplier;
    let expected_enhancement = round_to_tens(surcharged as f64 / p);

    // The discount is a flat multiplier on every attempt, so it commutes with
    // the expectation and is applied to the rounded value to stay exact.
    let (attempt_cost, expected_enhancement) = if adjusted.discounted {
        (apply_discount(surcharged)?, apply_discount(expected_enhancement)?)
    } else {
        (surcharged, expected_enhancement)
    };
    let expected_replacement = round_half_up(d * replacement_cost as f64 / p);

    Ok(StageOutcome {
        tier,
        base_cost: base,
        attempt_cost,
        success_probability: p,
        destruction_probability: d,
        expected_attempts: 1.0 / p,
        expected_cost: expected_enhancement + expected_replacement,
        expected_destructions: d / p,
        prevention_applied: adjusted.prevention_applied,
        milestone: adjusted.milestone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starforce::modifiers::BoostWindow;

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(round_to_tens(14.99), 10);
        assert_eq!(round_to_tens(15.0), 20);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
    }

    #[test]
    fn first_stage_expectation_uses_geometric_mean() {
        let stage = stage_outcome(0, 150, TierSystem::Legacy, &Modifiers::default(), 0).unwrap();
        assert_eq!(stage.base_cost, 136_000);
        assert_eq!(stage.attempt_cost, 136_000);
        assert!((stage.expected_attempts - 1.0 / 0.95).abs() < 1e-12);
        // 136_000 / 0.95 = 143_157.89...
        assert_eq!(stage.expected_cost, 143_160);
        assert_eq!(stage.expected_destructions, 0.0);
    }

    #[test]
    fn discount_scales_stage_by_exactly_seven_tenths() {
        for tier in 0..23 {
            let full = stage_outcome(tier, 150, TierSystem::Legacy, &Modifiers::default(), 0)
                .unwrap();
            let discounted = stage_outcome(
                tier,
                150,
                TierSystem::Legacy,
                &Modifiers {
                    cost_discount_30: true,
                    ..Modifiers::default()
                },
                0,
            )
            .unwrap();
            assert_eq!(discounted.expected_cost * 10, full.expected_cost * 7, "tier {tier}");
            assert_eq!(discounted.attempt_cost * 10, full.attempt_cost * 7, "tier {tier}");
        }
    }

    #[test]
    fn prevention_doubles_attempt_cost_and_removes_destruction() {
        let modifiers = Modifiers {
            prevent_destruction: true,
            ..Modifiers::default()
        };
        let plain = stage_outcome(13, 160, TierSystem::Legacy, &Modifiers::default(), 0).unwrap();
        let prevented = stage_outcome(13, 160, TierSystem::Legacy, &modifiers, 0).unwrap();
        assert_eq!(prevented.attempt_cost, plain.attempt_cost * 2);
        assert_eq!(prevented.destruction_probability, 0.0);
        assert_eq!(prevented.expected_destructions, 0.0);
        assert!(prevented.prevention_applied);
    }

    #[test]
    fn replacement_cost_charges_expected_destructions() {
        let without = stage_outcome(22, 200, TierSystem::Legacy, &Modifiers::default(), 0).unwrap();
        let with = stage_outcome(
            22,
            200,
            TierSystem::Legacy,
            &Modifiers::default(),
            1_000_000_000,
        )
        .unwrap();
        let expected_extra = round_half_up(0.194 * 1e9 / 0.03);
        assert_eq!(with.expected_cost - without.expected_cost, expected_extra);
    }

    #[test]
    fn boost_raises_success_inside_window() {
        let modifiers = Modifiers {
            boosted_success_window: Some(BoostWindow::default()),
            ..Modifiers::default()
        };
        let plain = stage_outcome(9, 150, TierSystem::Legacy, &Modifiers::default(), 0).unwrap();
        let boosted = stage_outcome(9, 150, TierSystem::Legacy, &modifiers, 0).unwrap();
        assert!(boosted.success_probability > plain.success_probability);
        assert!(boosted.expected_cost < plain.expected_cost);
    }
}
