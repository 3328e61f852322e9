use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::{validate_items, BatchFile, BatchOptions, BatchResult};
use crate::error::{EngineError, ValidationError};
use crate::potential::{PotentialRequest, PotentialResult};
use crate::server::AppState;
use crate::simulator::{AggregateResult, SimulationOptions};
use crate::starforce::{max_tier_for_level, tier_table, StarForceRequest, TierRow, TierSystem};

#[derive(Debug, Clone, Deserialize)]
pub struct CalculateRequest {
    #[serde(flatten)]
    pub request: StarForceRequest,
    #[serde(flatten)]
    pub options: BatchOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalculateResponse {
    pub status: &'static str,
    pub request: StarForceRequest,
    pub options: SimulationOptions,
    pub result: AggregateResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PotentialCalculateRequest {
    #[serde(flatten)]
    pub request: PotentialRequest,
    #[serde(flatten)]
    pub options: BatchOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct PotentialResponse {
    pub status: &'static str,
    pub request: PotentialRequest,
    pub options: SimulationOptions,
    #[serde(flatten)]
    pub result: PotentialResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResponse {
    pub status: &'static str,
    pub options: SimulationOptions,
    #[serde(flatten)]
    pub result: BatchResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct TablesResponse {
    pub system: TierSystem,
    pub level: u32,
    pub max_tier: u8,
    pub rows: Vec<TierRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub field: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationErrorResponse {
    fn single(field: &'static str, message: String) -> Self {
        Self {
            status: "error",
            message: "Validation failed",
            errors: vec![ValidationIssue {
                field,
                messages: vec![message],
            }],
        }
    }
}

impl From<ValidationError> for ValidationErrorResponse {
    fn from(err: ValidationError) -> Self {
        Self::single(err.field(), err.to_string())
    }
}

#[derive(Debug)]
pub enum CalculationPayloadError {
    Parse(serde_json::Error),
    Validation(ValidationErrorResponse),
    Unavailable(String),
    Internal(String),
}

impl fmt::Display for CalculationPayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Validation(_) => write!(f, "invalid calculation request"),
            Self::Unavailable(message) | Self::Internal(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for CalculationPayloadError {}

impl From<EngineError> for CalculationPayloadError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(err) => Self::Validation(err.into()),
            EngineError::Computation(err) => {
                tracing::error!(target: "starforce::server", error = %err, "computation failed");
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<ValidationError> for CalculationPayloadError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.into())
    }
}

fn to_payload<T: Serialize>(value: &T) -> Result<String, CalculationPayloadError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CalculationPayloadError::Internal(err.to_string()))
}

#[derive(Debug)]
pub enum JobLookupError {
    InvalidId(String),
    NotFound,
    Serialize(serde_json::Error),
}

impl fmt::Display for JobLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "'{id}' is not a valid job id"),
            Self::NotFound => write!(f, "Job not found"),
            Self::Serialize(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for JobLookupError {}

pub fn health_payload(state: &AppState) -> Result<String, serde_json::Error> {
    let config = state.engine.config();
    serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "starforce-api",
        "version": env!("CARGO_PKG_VERSION"),
        "workers": state.engine.queue().pool().current_threads(),
        "default_trials": config.default_trials,
        "max_trials": config.max_trials,
        "cache": state.engine.cache_stats(),
        "jobs": state.jobs.len(),
    }))
}

fn query_param<'a>(path: &'a str, name: &str) -> Option<&'a str> {
    let query = path.split('?').nth(1)?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

/// `GET /api/tables?system=legacy&level=150`. The system defaults to legacy.
pub fn tables_payload(path: &str) -> Result<String, CalculationPayloadError> {
    let system = match query_param(path, "system") {
        Some(raw) if !raw.is_empty() => raw.parse::<TierSystem>()?,
        _ => TierSystem::default(),
    };
    let level = match query_param(path, "level").map(str::parse::<u32>) {
        Some(Ok(level)) => level,
        Some(Err(_)) | None => {
            return Err(CalculationPayloadError::Validation(
                ValidationErrorResponse::single("level", "level must be a positive integer".into()),
            ))
        }
    };
    let response = TablesResponse {
        system,
        level,
        max_tier: max_tier_for_level(level, system)?,
        rows: tier_table(system, level)?,
    };
    to_payload(&response)
}

pub fn calculate_payload(state: &AppState, body: &str) -> Result<String, CalculationPayloadError> {
    let parsed: CalculateRequest =
        serde_json::from_str(body).map_err(CalculationPayloadError::Parse)?;
    let result = state.engine.calculate_stage(&parsed.request, &parsed.options)?;
    to_payload(&CalculateResponse {
        status: "ok",
        request: parsed.request,
        options: state.engine.options(&parsed.options),
        result,
    })
}

pub fn potential_payload(state: &AppState, body: &str) -> Result<String, CalculationPayloadError> {
    let parsed: PotentialCalculateRequest =
        serde_json::from_str(body).map_err(CalculationPayloadError::Parse)?;
    let result = state
        .engine
        .calculate_potential(&parsed.request, &parsed.options)?;
    to_payload(&PotentialResponse {
        status: "ok",
        request: parsed.request,
        options: state.engine.options(&parsed.options),
        result,
    })
}

pub fn batch_payload(state: &AppState, body: &str) -> Result<String, CalculationPayloadError> {
    let plan: BatchFile = serde_json::from_str(body).map_err(CalculationPayloadError::Parse)?;
    let result = state.engine.calculate_batch(&plan.items, &plan.options)?;
    to_payload(&BatchResponse {
        status: "ok",
        options: state.engine.options(&plan.options),
        result,
    })
}

/// Validates the plan up front so bad submissions fail with 400 instead of
/// producing a failed job.
pub fn job_submit_payload(state: &AppState, body: &str) -> Result<String, CalculationPayloadError> {
    let plan: BatchFile = serde_json::from_str(body).map_err(CalculationPayloadError::Parse)?;
    validate_items(&plan.items)?;
    state
        .engine
        .options(&plan.options)
        .validate(state.engine.config().max_trials)?;
    let record = state
        .jobs
        .submit(state.engine.clone(), plan)
        .map_err(|err| CalculationPayloadError::Unavailable(err.to_string()))?;
    to_payload(&record)
}

pub fn job_get_payload(state: &AppState, id: &str) -> Result<String, JobLookupError> {
    let id = Uuid::parse_str(id.trim()).map_err(|_| JobLookupError::InvalidId(id.to_string()))?;
    let record = state.jobs.get(id).ok_or(JobLookupError::NotFound)?;
    serde_json::to_string_pretty(&record).map_err(JobLookupError::Serialize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_finds_named_value() {
        let path = "/api/tables?system=extended&level=200";
        assert_eq!(query_param(path, "system"), Some("extended"));
        assert_eq!(query_param(path, "level"), Some("200"));
        assert_eq!(query_param(path, "missing"), None);
        assert_eq!(query_param("/api/tables", "level"), None);
    }

    #[test]
    fn tables_default_to_legacy() {
        let payload = tables_payload("/api/tables?level=150").unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["system"], "legacy");
        assert_eq!(value["max_tier"], 23);
        assert_eq!(value["rows"].as_array().map(Vec::len), Some(23));
    }

    #[test]
    fn tables_require_a_level() {
        match tables_payload("/api/tables?system=legacy") {
            Err(CalculationPayloadError::Validation(response)) => {
                assert_eq!(response.errors[0].field, "level");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_system_is_a_validation_error() {
        match tables_payload("/api/tables?system=future&level=150") {
            Err(CalculationPayloadError::Validation(response)) => {
                assert_eq!(response.errors[0].field, "tier_system");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
