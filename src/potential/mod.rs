//! Cube-based potential upgrades expressed on the same stage chain as star
//! force: one geometric stage per tier-up, plus an optional prime line stage.

pub mod cubes;

use serde::{Deserialize, Serialize};

pub use cubes::{CubeType, PotentialTier};

use crate::error::{EngineError, ValidationError};
use crate::simulator::chain::{ChainStage, StageChain};
use crate::simulator::{AggregateResult, Simulation, SimulationOptions};
use crate::starforce::stage::round_half_up;
use crate::starforce::{check_level, check_price};

/// Which cube to spend: a user override or a comparison of candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CubeChoice {
    Fixed {
        cube: CubeType,
    },
    Smart {
        #[serde(default = "default_candidates")]
        candidates: [CubeType; 2],
    },
}

fn default_candidates() -> [CubeType; 2] {
    [CubeType::Red, CubeType::Black]
}

impl Default for CubeChoice {
    fn default() -> Self {
        Self::Smart {
            candidates: default_candidates(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialRequest {
    pub item_level: u32,
    pub current_tier: PotentialTier,
    pub target_tier: PotentialTier,
    /// Prime lines wanted on the final roll, 1..=3.
    #[serde(default)]
    pub prime_lines: Option<u8>,
    #[serde(default)]
    pub cube: CubeChoice,
    /// Price per cube; overrides the default price of every cube evaluated.
    #[serde(default)]
    pub cube_cost: Option<u64>,
}

impl PotentialRequest {
    pub fn new(item_level: u32, current_tier: PotentialTier, target_tier: PotentialTier) -> Self {
        Self {
            item_level,
            current_tier,
            target_tier,
            prime_lines: None,
            cube: CubeChoice::default(),
            cube_cost: None,
        }
    }

    pub fn with_cube(mut self, cube: CubeType) -> Self {
        self.cube = CubeChoice::Fixed { cube };
        self
    }

    pub fn with_prime_lines(mut self, lines: u8) -> Self {
        self.prime_lines = Some(lines);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_level(self.item_level)?;
        if self.target_tier < self.current_tier {
            return Err(ValidationError::PotentialBelowCurrent {
                current: self.current_tier.to_string(),
                target: self.target_tier.to_string(),
            });
        }
        if let Some(lines) = self.prime_lines {
            if !(1..=3).contains(&lines) {
                return Err(ValidationError::PrimeLines(lines));
            }
        }
        match self.cube_cost {
            Some(0) => Err(ValidationError::CubeCost),
            Some(price) => check_price("cube_cost", price),
            None => Ok(()),
        }
    }

    fn price(&self, cube: CubeType) -> u64 {
        self.cube_cost.unwrap_or_else(|| cube.default_price())
    }
}

/// The cube a result was computed for. `recommended` marks a smart pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CubeSelection {
    pub cube: CubeType,
    pub recommended: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PotentialStageKind {
    TierUp {
        from: PotentialTier,
        to: PotentialTier,
    },
    PrimeLines {
        lines: u8,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PotentialStage {
    #[serde(flatten)]
    pub kind: PotentialStageKind,
    pub probability: f64,
    pub expected_cubes: f64,
    pub expected_cost: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PotentialResult {
    pub selection: CubeSelection,
    pub cube_cost: u64,
    pub stages: Vec<PotentialStage>,
    pub result: AggregateResult,
}

/// In-process record: the serialized result plus trial samples for joint
/// portfolio percentiles.
#[derive(Debug, Clone, PartialEq)]
pub struct PotentialSimulation {
    pub selection: CubeSelection,
    pub cube_cost: u64,
    pub stages: Vec<PotentialStage>,
    pub simulation: Simulation,
}

impl PotentialSimulation {
    pub fn to_result(&self) -> PotentialResult {
        PotentialResult {
            selection: self.selection,
            cube_cost: self.cube_cost,
            stages: self.stages.clone(),
            result: self.simulation.result.clone(),
        }
    }
}

/// Lowers a request for one specific cube to a stage chain.
pub fn potential_chain(
    request: &PotentialRequest,
    cube: CubeType,
) -> Result<(StageChain, Vec<PotentialStage>), EngineError> {
    request.validate()?;
    if request.target_tier > cube.max_tier() {
        return Err(ValidationError::CubeCannotReach {
            cube: cube.to_string(),
            target: request.target_tier.to_string(),
        }
        .into());
    }
    let price = request.price(cube);
    let mut chain = StageChain::default();
    let mut stages = Vec::new();

    let mut tier = request.current_tier;
    while tier < request.target_tier {
        let (Some(next), Some(rate)) = (tier.next(), cube.tier_up_rate(tier)) else {
            return Err(ValidationError::CubeCannotReach {
                cube: cube.to_string(),
                target: request.target_tier.to_string(),
            }
            .into());
        };
        let expected_cubes = 1.0 / rate;
        stages.push(PotentialStage {
            kind: PotentialStageKind::TierUp { from: tier, to: next },
            probability: rate,
            expected_cubes,
            expected_cost: round_half_up(price as f64 * expected_cubes),
        });
        chain.stages.push(ChainStage {
            success: rate,
            destruction: 0.0,
            attempt_cost: price,
            destruction_cost: 0,
            first_roll_shared: false,
        });
        tier = next;
    }

    if let Some(lines) = request.prime_lines.filter(|lines| *lines > 1) {
        let q = cube.prime_line_probability(lines);
        // The roll that landed the last tier-up already rolled lines.
        let shared = !chain.stages.is_empty();
        let expected_cubes = if shared { (1.0 - q) / q } else { 1.0 / q };
        stages.push(PotentialStage {
            kind: PotentialStageKind::PrimeLines { lines },
            probability: q,
            expected_cubes,
            expected_cost: round_half_up(price as f64 * expected_cubes),
        });
        chain.stages.push(ChainStage {
            success: q,
            destruction: 0.0,
            attempt_cost: price,
            destruction_cost: 0,
            first_roll_shared: shared,
        });
    }

    chain.expected_cost = stages.iter().map(|stage| stage.expected_cost).sum();
    chain.expected_attempts = stages.iter().map(|stage| stage.expected_cubes).sum();
    Ok((chain, stages))
}

/// Resolves the cube choice. Smart choice keeps the cheapest candidate by
/// exact expectation and skips candidates that cannot reach the target.
fn select_cube(
    request: &PotentialRequest,
) -> Result<(CubeSelection, StageChain, Vec<PotentialStage>), EngineError> {
    match request.cube {
        CubeChoice::Fixed { cube } => {
            let (chain, stages) = potential_chain(request, cube)?;
            Ok((
                CubeSelection {
                    cube,
                    recommended: false,
                },
                chain,
                stages,
            ))
        }
        CubeChoice::Smart { candidates } => {
            let mut best: Option<(CubeType, StageChain, Vec<PotentialStage>)> = None;
            let mut unreachable = None;
            for cube in candidates {
                match potential_chain(request, cube) {
                    Ok((chain, stages)) => {
                        let cheaper = best.as_ref().map_or(true, |(_, current, _)| {
                            chain.expected_cost < current.expected_cost
                        });
                        if cheaper {
                            best = Some((cube, chain, stages));
                        }
                    }
                    Err(EngineError::Validation(err @ ValidationError::CubeCannotReach { .. })) => {
                        unreachable.get_or_insert(err);
                    }
                    Err(err) => return Err(err),
                }
            }
            match best {
                Some((cube, chain, stages)) => Ok((
                    CubeSelection {
                        cube,
                        recommended: true,
                    },
                    chain,
                    stages,
                )),
                None => Err(unreachable
                    .unwrap_or_else(|| ValidationError::CubeCannotReach {
                        cube: candidates[0].to_string(),
                        target: request.target_tier.to_string(),
                    })
                    .into()),
            }
        }
    }
}

pub fn simulate_potential(
    request: &PotentialRequest,
    options: &SimulationOptions,
    max_trials: usize,
) -> Result<PotentialSimulation, EngineError> {
    options.validate(max_trials)?;
    let (selection, chain, stages) = select_cube(request)?;
    let simulation = Simulation::from_chain(&chain, Vec::new(), options);
    Ok(PotentialSimulation {
        selection,
        cube_cost: request.price(selection.cube),
        stages,
        simulation,
    })
}

/// Expected cube spend and percentile outcomes for one potential goal.
pub fn calculate_potential(
    request: &PotentialRequest,
    options: &SimulationOptions,
) -> Result<PotentialResult, EngineError> {
    simulate_potential(request, options, crate::simulator::DEFAULT_MAX_TRIALS)
        .map(|simulation| simulation.to_result())
}
