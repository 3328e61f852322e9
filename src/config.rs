//! Engine and server settings: defaults, an optional YAML/JSON file, then
//! environment overrides.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::simulator::percentile::DEFAULT_PERCENTILES;
use crate::simulator::{SimulationOptions, DEFAULT_MAX_TRIALS, DEFAULT_TRIALS};

pub const CONFIG_ENV: &str = "STARFORCE_CONFIG";
pub const BIND_ENV: &str = "STARFORCE_BIND";
pub const TRIALS_ENV: &str = "STARFORCE_TRIALS";
pub const WORKERS_ENV: &str = "STARFORCE_WORKERS";

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_STATIC_DIR: &str = "frontend/dist";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bind: String,
    pub default_trials: usize,
    pub max_trials: usize,
    /// Worker threads for calculations; 0 uses every core.
    pub workers: usize,
    /// Memoized results kept per cache; 0 disables caching.
    pub cache_capacity: usize,
    pub seed: u64,
    pub percentiles: Vec<f64>,
    pub static_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            default_trials: DEFAULT_TRIALS,
            max_trials: DEFAULT_MAX_TRIALS,
            workers: 0,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            seed: 0,
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads YAML, or JSON when the file name ends in `.json`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let display = path.as_ref().display().to_string();
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let parse_error = |message: String| ConfigError::Parse {
            path: display.clone(),
            message,
        };
        let config: EngineConfig = if display.to_lowercase().ends_with(".json") {
            serde_json::from_str(&content).map_err(|err| parse_error(err.to_string()))?
        } else {
            serde_yaml::from_str(&content).map_err(|err| parse_error(err.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the file named by `STARFORCE_CONFIG`, then the
    /// individual environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::default(),
        };
        config.apply_overrides(&lookup);
        config.validate()?;
        Ok(config)
    }

    /// Applies environment overrides. Unparsable values are ignored with a
    /// warning.
    pub fn apply_overrides<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(BIND_ENV).filter(|value| !value.trim().is_empty()) {
            self.bind = bind.trim().to_string();
        }
        if let Some(trials) = parse_override(lookup, TRIALS_ENV) {
            self.default_trials = trials;
        }
        if let Some(workers) = parse_override(lookup, WORKERS_ENV) {
            self.workers = workers;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_trials == 0 {
            return Err(ConfigError::Invalid("max_trials must be at least 1".into()));
        }
        if self.default_trials == 0 || self.default_trials > self.max_trials {
            return Err(ConfigError::Invalid(format!(
                "default_trials {} must be between 1 and max_trials {}",
                self.default_trials, self.max_trials
            )));
        }
        self.simulation_options()
            .validate(self.max_trials)
            .map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Simulation defaults for requests that do not override them.
    pub fn simulation_options(&self) -> SimulationOptions {
        SimulationOptions {
            trials: self.default_trials,
            seed: self.seed,
            percentiles: self.percentiles.clone(),
            trial_budget: None,
            parallel: true,
        }
    }
}

fn parse_override<F>(lookup: &F, key: &str) -> Option<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(target: "starforce::config", key, value = %raw, "ignoring invalid override");
            None
        }
    }
}
