//! Per-tier success, destruction and meso cost tables for both tier systems.
//!
//! Every table is indexed by the tier an attempt starts from, so a system whose
//! maximum tier is `M` has rows `0..M`. Lookups outside that domain fail with
//! [ValidationError::TierOutOfRange] instead of extrapolating.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const LEGACY_MAX_TIER: u8 = 23;
pub const EXTENDED_MAX_TIER: u8 = 30;

/// Highest item level the tables are defined for. Base costs grow with the
/// cube of the level, so this also keeps every meso total inside `u64`.
pub const MAX_ITEM_LEVEL: u32 = 300;

/// Ceiling on caller-supplied prices (replacement and cube costs): the most
/// meso one character can hold.
pub const MAX_MESO_PRICE: u64 = 10_000_000_000;

/// Tiers at which the guaranteed-milestone event forces success.
pub const MILESTONE_TIERS: [u8; 3] = [5, 10, 15];

const LEGACY_SUCCESS: [f64; LEGACY_MAX_TIER as usize] = [
    0.95, 0.90, 0.85, 0.85, 0.80, 0.75, 0.70, 0.65, 0.60, 0.55, // 0-9
    0.50, 0.45, 0.40, 0.35, 0.30, 0.30, 0.30, 0.30, 0.30, 0.30, // 10-19
    0.30, 0.30, 0.03, // 20-22
];

const LEGACY_DESTRUCTION: [f64; LEGACY_MAX_TIER as usize] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // 0-9
    0.0, 0.0, 0.006, 0.013, 0.014, 0.021, 0.021, 0.021, 0.028, 0.028, // 10-19
    0.07, 0.07, 0.194, // 20-22
];

const EXTENDED_SUCCESS: [f64; EXTENDED_MAX_TIER as usize] = [
    0.95, 0.90, 0.85, 0.85, 0.80, 0.75, 0.70, 0.65, 0.60, 0.55, // 0-9
    0.50, 0.45, 0.40, 0.35, 0.30, 0.30, 0.30, 0.15, 0.15, 0.15, // 10-19
    0.15, 0.15, 0.15, 0.10, 0.10, 0.10, 0.07, 0.05, 0.03, 0.01, // 20-29
];

const EXTENDED_DESTRUCTION: [f64; EXTENDED_MAX_TIER as usize] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, // 0-9
    0.0, 0.0, 0.0, 0.0, 0.0, 0.021, 0.021, 0.068, 0.068, 0.085, // 10-19
    0.105, 0.1275, 0.17, 0.18, 0.18, 0.18, 0.186, 0.19, 0.194, 0.198, // 20-29
];

/// Level bands shared by both systems: `(highest level in band, max tier)`.
/// Levels above the last band reach the system maximum.
const LEVEL_BANDS: [(u32, u8); 5] = [(94, 5), (107, 8), (117, 10), (127, 15), (137, 20)];

/// Named table set selecting probabilities, costs and the tier ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSystem {
    #[default]
    Legacy,
    Extended,
}

impl TierSystem {
    pub const fn max_tier(self) -> u8 {
        match self {
            Self::Legacy => LEGACY_MAX_TIER,
            Self::Extended => EXTENDED_MAX_TIER,
        }
    }

    /// First tier at which destruction becomes possible.
    pub const fn destruction_floor(self) -> u8 {
        match self {
            Self::Legacy => 12,
            Self::Extended => 15,
        }
    }

    /// Highest tier at which destruction prevention can be applied.
    pub const fn prevention_ceiling(self) -> u8 {
        match self {
            Self::Legacy => 16,
            Self::Extended => 17,
        }
    }

    pub fn prevention_eligible(self, tier: u8) -> bool {
        (self.destruction_floor()..=self.prevention_ceiling()).contains(&tier)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Extended => "extended",
        }
    }

    fn success_table(self) -> &'static [f64] {
        match self {
            Self::Legacy => &LEGACY_SUCCESS,
            Self::Extended => &EXTENDED_SUCCESS,
        }
    }

    fn destruction_table(self) -> &'static [f64] {
        match self {
            Self::Legacy => &LEGACY_DESTRUCTION,
            Self::Extended => &EXTENDED_DESTRUCTION,
        }
    }

    fn check_tier(self, tier: u8) -> Result<usize, ValidationError> {
        if tier < self.max_tier() {
            Ok(tier as usize)
        } else {
            Err(ValidationError::TierOutOfRange {
                tier,
                system: self,
                max: self.max_tier(),
            })
        }
    }
}

impl fmt::Display for TierSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TierSystem {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(Self::Legacy),
            "extended" | "new" => Ok(Self::Extended),
            _ => Err(ValidationError::UnknownTierSystem(value.to_string())),
        }
    }
}

/// Highest tier an item of `level` can reach. Total for every level in
/// `1..=MAX_ITEM_LEVEL` and non-decreasing in level.
pub fn max_tier_for_level(level: u32, system: TierSystem) -> Result<u8, ValidationError> {
    check_level(level)?;
    Ok(LEVEL_BANDS
        .iter()
        .find(|(upper, _)| level <= *upper)
        .map(|(_, max)| *max)
        .unwrap_or(system.max_tier()))
}

/// Accepts levels `1..=MAX_ITEM_LEVEL`.
pub fn check_level(level: u32) -> Result<(), ValidationError> {
    match level {
        0 => Err(ValidationError::InvalidLevel),
        level if level > MAX_ITEM_LEVEL => Err(ValidationError::LevelAboveMaximum {
            level,
            max: MAX_ITEM_LEVEL,
        }),
        _ => Ok(()),
    }
}

/// Rejects a caller-supplied price above [MAX_MESO_PRICE].
pub fn check_price(field: &'static str, value: u64) -> Result<(), ValidationError> {
    if value > MAX_MESO_PRICE {
        return Err(ValidationError::PriceAboveMaximum {
            field,
            value,
            max: MAX_MESO_PRICE,
        });
    }
    Ok(())
}

pub fn success_probability(tier: u8, system: TierSystem) -> Result<f64, ValidationError> {
    let index = system.check_tier(tier)?;
    Ok(system.success_table()[index])
}

pub fn destruction_probability(tier: u8, system: TierSystem) -> Result<f64, ValidationError> {
    let index = system.check_tier(tier)?;
    Ok(system.destruction_table()[index])
}

/// Cost regime divisor applied to `(tier + 1)^2.7`, or `None` for the linear
/// low-tier regime.
fn regime_divisor(tier: u8, system: TierSystem) -> Option<f64> {
    match (tier, system) {
        (0..=9, _) => None,
        (10..=14, _) => Some(400.0),
        (22.., TierSystem::Extended) => Some(150.0),
        _ => Some(200.0),
    }
}

/// Meso charged per attempt from `tier`, rounded half-up to the nearest 100.
pub fn base_cost(tier: u8, level: u32, system: TierSystem) -> Result<u64, ValidationError> {
    system.check_tier(tier)?;
    check_level(level)?;
    let level_cubed = f64::from(level).powi(3);
    let next = f64::from(tier) + 1.0;
    let scaled = match regime_divisor(tier, system) {
        None => level_cubed * next / 25.0,
        Some(divisor) => level_cubed * next.powf(2.7) / divisor,
    };
    let raw = 1000.0 + scaled;
    Ok(((raw / 100.0 + 0.5).floor() as u64) * 100)
}

/// One display row of a tier table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierRow {
    pub tier: u8,
    pub base_cost: u64,
    pub success: f64,
    pub destruction: f64,
    pub prevention_eligible: bool,
}

/// Every stage row an item of `level` can attempt under `system`.
pub fn tier_table(system: TierSystem, level: u32) -> Result<Vec<TierRow>, ValidationError> {
    let max = max_tier_for_level(level, system)?;
    (0..max)
        .map(|tier| {
            Ok(TierRow {
                tier,
                base_cost: base_cost(tier, level, system)?,
                success: success_probability(tier, system)?,
                destruction: destruction_probability(tier, system)?,
                prevention_eligible: system.prevention_eligible(tier),
            })
        })
        .collect()
}

/// Verifies the table invariants for one system and returns every violation
/// found. An empty list means the tables are consistent.
pub fn check_tables(system: TierSystem) -> Vec<String> {
    let mut problems = Vec::new();
    let success = system.success_table();
    let destruction = system.destruction_table();
    let floor = system.destruction_floor() as usize;

    for tier in 0..success.len() {
        let (p, d) = (success[tier], destruction[tier]);
        if !(p > 0.0 && p <= 1.0) {
            problems.push(format!("{system} tier {tier}: success {p} outside (0, 1]"));
        }
        if !(0.0..1.0).contains(&d) {
            problems.push(format!("{system} tier {tier}: destruction {d} outside [0, 1)"));
        }
        if p + d > 1.0 {
            problems.push(format!("{system} tier {tier}: success + destruction exceeds 1"));
        }
        if tier < floor && d != 0.0 {
            problems.push(format!(
                "{system} tier {tier}: destruction below floor {floor} must be zero"
            ));
        }
        if tier > 0 {
            if p > success[tier - 1] {
                problems.push(format!("{system} tier {tier}: success increases"));
            }
            if d < destruction[tier - 1] {
                problems.push(format!("{system} tier {tier}: destruction decreases"));
            }
        }
    }
    if destruction.get(floor).copied().unwrap_or(0.0) == 0.0 {
        problems.push(format!("{system}: destruction floor {floor} has no destruction"));
    }
    problems
}
