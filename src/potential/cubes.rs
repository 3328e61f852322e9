//! Cube catalogue: tier-up rates, prime line odds and default prices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Potential rank, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PotentialTier {
    Rare,
    Epic,
    Unique,
    Legendary,
}

impl PotentialTier {
    pub const ALL: [PotentialTier; 4] = [Self::Rare, Self::Epic, Self::Unique, Self::Legendary];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Unique => "unique",
            Self::Legendary => "legendary",
        }
    }

    pub fn next(self) -> Option<PotentialTier> {
        match self {
            Self::Rare => Some(Self::Epic),
            Self::Epic => Some(Self::Unique),
            Self::Unique => Some(Self::Legendary),
            Self::Legendary => None,
        }
    }
}

impl fmt::Display for PotentialTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PotentialTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rare" => Ok(Self::Rare),
            "epic" => Ok(Self::Epic),
            "unique" => Ok(Self::Unique),
            "legendary" | "legend" => Ok(Self::Legendary),
            other => Err(format!("unknown potential tier '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeType {
    Occult,
    MasterCraftsman,
    Meister,
    Red,
    Black,
}

struct CubeData {
    /// Rare->Epic, Epic->Unique, Unique->Legendary. Zero where the cube stops.
    tier_up: [f64; 3],
    max_tier: PotentialTier,
    /// Chance that line 2 and line 3 roll a prime stat. Line 1 always does.
    prime_lines: (f64, f64),
    price: u64,
}

const fn cube_data(cube: CubeType) -> CubeData {
    match cube {
        CubeType::Occult => CubeData {
            tier_up: [0.009901, 0.0, 0.0],
            max_tier: PotentialTier::Epic,
            prime_lines: (0.01, 0.01),
            price: 1_000_000,
        },
        CubeType::MasterCraftsman => CubeData {
            tier_up: [0.047619, 0.011858, 0.0],
            max_tier: PotentialTier::Unique,
            prime_lines: (0.05, 0.01),
            price: 2_000_000,
        },
        CubeType::Meister => CubeData {
            tier_up: [0.079994, 0.016959, 0.001996],
            max_tier: PotentialTier::Legendary,
            prime_lines: (0.08, 0.02),
            price: 4_000_000,
        },
        CubeType::Red => CubeData {
            tier_up: [0.06, 0.018, 0.003],
            max_tier: PotentialTier::Legendary,
            prime_lines: (0.10, 0.01),
            price: 12_000_000,
        },
        CubeType::Black => CubeData {
            tier_up: [0.15, 0.035, 0.014],
            max_tier: PotentialTier::Legendary,
            prime_lines: (0.20, 0.05),
            price: 22_000_000,
        },
    }
}

impl CubeType {
    pub const ALL: [CubeType; 5] = [
        Self::Occult,
        Self::MasterCraftsman,
        Self::Meister,
        Self::Red,
        Self::Black,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Occult => "occult",
            Self::MasterCraftsman => "master_craftsman",
            Self::Meister => "meister",
            Self::Red => "red",
            Self::Black => "black",
        }
    }

    /// Highest potential tier this cube can roll.
    pub const fn max_tier(self) -> PotentialTier {
        cube_data(self).max_tier
    }

    pub const fn default_price(self) -> u64 {
        cube_data(self).price
    }

    /// Chance one use moves `from` up a tier, or `None` when the cube cannot.
    pub fn tier_up_rate(self, from: PotentialTier) -> Option<f64> {
        let index = match from {
            PotentialTier::Rare => 0,
            PotentialTier::Epic => 1,
            PotentialTier::Unique => 2,
            PotentialTier::Legendary => return None,
        };
        let rate = cube_data(self).tier_up[index];
        (rate > 0.0).then_some(rate)
    }

    /// Chance that one roll leaves at least `lines` prime lines (1..=3).
    pub fn prime_line_probability(self, lines: u8) -> f64 {
        let (second, third) = cube_data(self).prime_lines;
        match lines {
            0 | 1 => 1.0,
            2 => 1.0 - (1.0 - second) * (1.0 - third),
            _ => second * third,
        }
    }
}

impl fmt::Display for CubeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CubeType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "occult" => Ok(Self::Occult),
            "mastercraftsman" | "master" => Ok(Self::MasterCraftsman),
            "meister" => Ok(Self::Meister),
            "red" => Ok(Self::Red),
            "black" => Ok(Self::Black),
            _ => Err(format!("unknown cube '{value}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_up_rates_stop_at_cube_maximum() {
        assert!(CubeType::Occult.tier_up_rate(PotentialTier::Rare).is_some());
        assert_eq!(CubeType::Occult.tier_up_rate(PotentialTier::Epic), None);
        assert_eq!(CubeType::MasterCraftsman.tier_up_rate(PotentialTier::Unique), None);
        assert_eq!(CubeType::Black.tier_up_rate(PotentialTier::Unique), Some(0.014));
        assert_eq!(CubeType::Red.tier_up_rate(PotentialTier::Legendary), None);
    }

    #[test]
    fn max_tier_agrees_with_rates() {
        for cube in CubeType::ALL {
            let mut tier = PotentialTier::Rare;
            while let Some(next) = tier.next() {
                if cube.tier_up_rate(tier).is_none() {
                    break;
                }
                tier = next;
            }
            assert_eq!(tier, cube.max_tier(), "{cube}");
        }
    }

    #[test]
    fn prime_line_probability_shrinks_with_more_lines() {
        for cube in CubeType::ALL {
            let one = cube.prime_line_probability(1);
            let two = cube.prime_line_probability(2);
            let three = cube.prime_line_probability(3);
            assert_eq!(one, 1.0);
            assert!(two > three && three > 0.0, "{cube}");
        }
        let red_two = CubeType::Red.prime_line_probability(2);
        assert!((red_two - (1.0 - 0.9 * 0.99)).abs() < 1e-12);
    }

    #[test]
    fn names_parse_loosely() {
        assert_eq!("Master Craftsman".parse(), Ok(CubeType::MasterCraftsman));
        assert_eq!("master_craftsman".parse(), Ok(CubeType::MasterCraftsman));
        assert_eq!("BLACK".parse(), Ok(CubeType::Black));
        assert!("gold".parse::<CubeType>().is_err());
        assert_eq!("legend".parse(), Ok(PotentialTier::Legendary));
    }
}
