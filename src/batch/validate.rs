//! Diagnostics for batch plan files: hard errors that would reject the plan
//! plus warnings and notes about settings that have no effect.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::batch::load::{read_document, LoadError};
use crate::batch::{BatchOptions, ItemDescriptor, StarForceGoal};
use crate::simulator::SimulationOptions;
use crate::starforce::tables::MILESTONE_TIERS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.count(ValidationSeverity::Error) > 0
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

pub fn validate_batch_file(
    path: impl AsRef<Path>,
    max_trials: usize,
) -> Result<ValidationReport, LoadError> {
    Ok(validate_batch_value(&read_document(path)?, max_trials))
}

pub fn validate_batch_value(document: &Value, max_trials: usize) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(entries) = document
        .get("items")
        .and_then(Value::as_array)
        .or_else(|| document.as_array())
    else {
        report.push(
            ValidationSeverity::Error,
            "document",
            "expected top-level array or { items: [...] }",
        );
        return report;
    };

    if let Some(options) = document.get("options") {
        validate_options(&mut report, options, max_trials);
    }
    if entries.is_empty() {
        report.push(ValidationSeverity::Warning, "items", "plan has no items");
    }

    let mut seen_ids = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let base_context = format!("items[{index}]");
        if !entry.is_object() {
            report.push(ValidationSeverity::Error, base_context, "entry is not an object");
            continue;
        }

        let item: ItemDescriptor = match serde_json::from_value(entry.clone()) {
            Ok(item) => item,
            Err(err) => {
                report.push(ValidationSeverity::Error, base_context, err.to_string());
                continue;
            }
        };
        let context = format!("{base_context} id='{}'", item.id);

        if !item.id.trim().is_empty() && !seen_ids.insert(item.id.clone()) {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.id"),
                format!("duplicate id '{}'", item.id),
            );
        }
        if let Err(err) = item.validate() {
            report.push(
                ValidationSeverity::Error,
                format!("{context}.{}", err.field()),
                err.to_string(),
            );
            continue;
        }
        if !item.included {
            report.push(
                ValidationSeverity::Info,
                context.clone(),
                "excluded from portfolio totals",
            );
        }
        if let Some(goal) = &item.star_force {
            validate_star_force_goal(&mut report, &context, goal);
        }
        if item.potential.and_then(|goal| goal.prime_lines) == Some(1) {
            report.push(
                ValidationSeverity::Info,
                format!("{context}.potential.prime_lines"),
                "one prime line is always rolled; no extra cubes are needed",
            );
        }
    }

    report
}

fn validate_options(report: &mut ValidationReport, options: &Value, max_trials: usize) {
    let options: BatchOptions = match serde_json::from_value(options.clone()) {
        Ok(options) => options,
        Err(err) => {
            report.push(ValidationSeverity::Error, "options", err.to_string());
            return;
        }
    };
    if let Err(err) = options.resolve(&SimulationOptions::default()).validate(max_trials) {
        report.push(
            ValidationSeverity::Error,
            format!("options.{}", err.field()),
            err.to_string(),
        );
    }
}

fn validate_star_force_goal(report: &mut ValidationReport, context: &str, goal: &StarForceGoal) {
    let stages = goal.current_tier..goal.target_tier;
    let system = goal.tier_system;
    let modifiers = &goal.modifiers;

    if modifiers.prevent_destruction && !stages.clone().any(|tier| system.prevention_eligible(tier))
    {
        report.push(
            ValidationSeverity::Warning,
            format!("{context}.star_force.modifiers.prevent_destruction"),
            format!(
                "no stage in {}..{} is eligible for destruction prevention ({} window {}..={})",
                goal.current_tier,
                goal.target_tier,
                system,
                system.destruction_floor(),
                system.prevention_ceiling()
            ),
        );
    }
    if let Some(window) = modifiers.boosted_success_window {
        if !stages.clone().any(|tier| window.contains(tier)) {
            report.push(
                ValidationSeverity::Warning,
                format!("{context}.star_force.modifiers.boosted_success_window"),
                "boost window does not overlap any stage",
            );
        }
    }
    if modifiers.guaranteed_milestone && !MILESTONE_TIERS.iter().any(|tier| stages.contains(tier)) {
        report.push(
            ValidationSeverity::Warning,
            format!("{context}.star_force.modifiers.guaranteed_milestone"),
            "no milestone tier is attempted",
        );
    }
    if goal.replacement_cost == 0 && goal.target_tier > system.destruction_floor() {
        report.push(
            ValidationSeverity::Info,
            format!("{context}.star_force.replacement_cost"),
            "destructions are counted but not charged",
        );
    }
}
