pub mod batch;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod parallel;
pub mod potential;
pub mod server;
pub mod simulator;
pub mod starforce;

pub use engine::Engine;
pub use error::{ComputationError, EngineError, ValidationError};
