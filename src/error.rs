//! Error taxonomy for the calculation engine.
//!
//! [ValidationError] covers malformed or out-of-range requests and is always
//! reported to the caller. [ComputationError] means a table or modifier
//! precedence bug produced an impossible value; it is never clamped away.
//! The engine does no I/O, so nothing here is retryable.

use thiserror::Error;

use crate::starforce::TierSystem;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("item level must be at least 1")]
    InvalidLevel,

    #[error("item level {level} exceeds maximum {max}")]
    LevelAboveMaximum { level: u32, max: u32 },

    #[error("{field} {value} exceeds maximum {max}")]
    PriceAboveMaximum {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("target tier {target} is below current tier {current}")]
    TargetBelowCurrent { current: u8, target: u8 },

    #[error("target tier {target} exceeds maximum {max} for item level {level}")]
    TargetAboveMaximum { target: u8, max: u8, level: u32 },

    #[error("tier {tier} is outside the {system} table (0..{max})")]
    TierOutOfRange {
        tier: u8,
        system: TierSystem,
        max: u8,
    },

    #[error("unknown tier system '{0}' (expected 'legacy' or 'extended')")]
    UnknownTierSystem(String),

    #[error("trial count {requested} must be between 1 and {max}")]
    TrialCount { requested: usize, max: usize },

    #[error("percentile {0} must be greater than 0 and at most 100")]
    Percentile(f64),

    #[error("boost window {from}..={to} with multiplier {multiplier} is invalid")]
    BoostWindow { from: u8, to: u8, multiplier: f64 },

    #[error("target potential {target} is below current potential {current}")]
    PotentialBelowCurrent { current: String, target: String },

    #[error("{cube} cubes cannot reach {target} potential")]
    CubeCannotReach { cube: String, target: String },

    #[error("prime line count {0} must be between 1 and 3")]
    PrimeLines(u8),

    #[error("cube price must be greater than 0")]
    CubeCost,

    #[error("item id must not be empty")]
    EmptyItemId,

    #[error("item id '{0}' appears more than once")]
    DuplicateItemId(String),

    #[error("item '{0}' has neither a star force nor a potential goal")]
    EmptyItemGoal(String),

    #[error("item '{id}': {source}")]
    Item {
        id: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Request field the failed constraint belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidLevel | Self::LevelAboveMaximum { .. } => "item_level",
            Self::PriceAboveMaximum { field, .. } => *field,
            Self::TargetBelowCurrent { .. } | Self::TargetAboveMaximum { .. } => "target_tier",
            Self::TierOutOfRange { .. } => "current_tier",
            Self::UnknownTierSystem(_) => "tier_system",
            Self::TrialCount { .. } => "trials",
            Self::Percentile(_) => "percentiles",
            Self::BoostWindow { .. } => "modifiers.boosted_success_window",
            Self::PotentialBelowCurrent { .. } => "target_tier",
            Self::CubeCannotReach { .. } => "cube",
            Self::PrimeLines(_) => "prime_lines",
            Self::CubeCost => "cube_cost",
            Self::EmptyItemId | Self::DuplicateItemId(_) => "id",
            Self::EmptyItemGoal(_) => "items",
            Self::Item { source, .. } => source.field(),
        }
    }

    pub fn for_item(self, id: &str) -> Self {
        Self::Item {
            id: id.to_string(),
            source: Box::new(self),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("stage {tier}: {name} probability {value} is outside [0, 1]")]
    ProbabilityOutOfRange {
        tier: u8,
        name: &'static str,
        value: f64,
    },

    #[error("stage {tier}: success {success} and destruction {destruction} exceed 1 combined")]
    ProbabilityMass {
        tier: u8,
        success: f64,
        destruction: f64,
    },

    #[error("stage {tier}: success probability is zero, stage can never clear")]
    Unreachable { tier: u8 },

    #[error("cost {value} is not divisible by the discount denominator {denominator}")]
    Indivisible { value: u64, denominator: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("internal computation error: {0}")]
    Computation(#[from] ComputationError),
}

impl EngineError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
