//! Generic multi-stage retry process shared by star force and potential.

/// One retry loop: every attempt costs `attempt_cost`; with probability
/// `destruction` it destroys the item (charged `destruction_cost`, progress
/// kept), with probability `success` the stage clears, otherwise it retries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainStage {
    pub success: f64,
    pub destruction: f64,
    pub attempt_cost: u64,
    pub destruction_cost: u64,
    /// The roll that cleared the previous stage also counts as this stage's
    /// first roll, free of charge.
    pub first_roll_shared: bool,
}

/// Ordered stages plus their exact closed-form expectations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageChain {
    pub stages: Vec<ChainStage>,
    pub expected_cost: u64,
    pub expected_destructions: f64,
    pub expected_attempts: f64,
}

impl StageChain {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
