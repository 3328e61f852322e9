use std::io;

use crate::batch::load_batch_file;
use crate::batch::report::write_batch_csv;
use crate::batch::validate::{validate_batch_file, ValidationSeverity};
use crate::batch::BatchOptions;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::potential::cubes::CubeType;
use crate::potential::{CubeChoice, PotentialRequest, PotentialResult, PotentialStageKind, PotentialTier};
use crate::server;
use crate::simulator::AggregateResult;
use crate::starforce::{
    check_tables, max_tier_for_level, tier_table, BoostWindow, Modifiers, StarForceRequest,
    TierSystem,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Calculate,
    Potential,
    Batch,
    Tables,
    Validate,
}

const USAGE: &str = "usage: starforce <serve|calculate|potential|batch|tables|validate>";
const CALCULATE_USAGE: &str = "usage: starforce calculate <level> <current> <target> [legacy|extended] [--discount] [--catch] [--boost] [--safeguard] [--milestones] [--replacement-cost N] [--trials N] [--seed N] [--table]";
const POTENTIAL_USAGE: &str = "usage: starforce potential <level> <current> <target> [occult|master|meister|red|black|smart] [--lines N] [--cube-cost N] [--trials N] [--seed N] [--table]";
const BATCH_USAGE: &str = "usage: starforce batch <plan.json|plan.yaml> [--csv] [--trials N] [--seed N]";
const TABLES_USAGE: &str = "usage: starforce tables <legacy|extended> <level> [--check]";
const VALIDATE_USAGE: &str = "usage: starforce validate <plan.json|plan.yaml>";

/// Flags that consume the following argument.
const VALUE_FLAGS: [&str; 5] = ["--trials", "--seed", "--lines", "--cube-cost", "--replacement-cost"];

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("calculate") => Some(Command::Calculate),
        Some("potential") => Some(Command::Potential),
        Some("batch") => Some(Command::Batch),
        Some("tables") => Some(Command::Tables),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Serve) => with_config(handle_serve),
        Some(Command::Calculate) => {
            with_config(|config| handle_calculate(args, &Engine::new(config)))
        }
        Some(Command::Potential) => {
            with_config(|config| handle_potential(args, &Engine::new(config)))
        }
        Some(Command::Batch) => with_config(|config| handle_batch(args, &Engine::new(config))),
        Some(Command::Tables) => handle_tables(args),
        Some(Command::Validate) => with_config(|config| handle_validate(args, &config)),
        None => {
            eprintln!("{USAGE}");
            2
        }
    }
}

fn with_config<F>(run: F) -> i32
where
    F: FnOnce(EngineConfig) -> i32,
{
    match EngineConfig::load() {
        Ok(config) => run(config),
        Err(err) => {
            eprintln!("config error: {err}");
            1
        }
    }
}

fn handle_serve(config: EngineConfig) -> i32 {
    match server::run_server(config) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

fn handle_calculate(args: &[String], engine: &Engine) -> i32 {
    let positional = positional_args(args);
    let (Some(level), Some(current), Some(target)) = (
        positional.first().and_then(|raw| raw.parse::<u32>().ok()),
        positional.get(1).and_then(|raw| raw.parse::<u8>().ok()),
        positional.get(2).and_then(|raw| raw.parse::<u8>().ok()),
    ) else {
        eprintln!("{CALCULATE_USAGE}");
        return 2;
    };
    let tier_system = match positional.get(3).map(|raw| raw.parse::<TierSystem>()) {
        None => TierSystem::Legacy,
        Some(Ok(system)) => system,
        Some(Err(err)) => {
            eprintln!("{err}");
            return 2;
        }
    };

    let modifiers = Modifiers {
        cost_discount_30: has_flag(args, "--discount"),
        catch_bonus: has_flag(args, "--catch"),
        boosted_success_window: has_flag(args, "--boost").then(BoostWindow::default),
        prevent_destruction: has_flag(args, "--safeguard"),
        guaranteed_milestone: has_flag(args, "--milestones"),
    };
    let mut request =
        StarForceRequest::new(level, current, target, tier_system).with_modifiers(modifiers);
    request.replacement_cost =
        parse_u64_arg(flag_value(args, "--replacement-cost"), "replacement cost", 0);

    match engine.calculate_stage(&request, &option_overrides(args)) {
        Ok(result) if has_flag(args, "--table") => {
            print_stage_table(&request, &result);
            0
        }
        Ok(result) => print_json(&result),
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn handle_potential(args: &[String], engine: &Engine) -> i32 {
    let positional = positional_args(args);
    let (Some(level), Some(current), Some(target)) = (
        positional.first().and_then(|raw| raw.parse::<u32>().ok()),
        positional.get(1).and_then(|raw| raw.parse::<PotentialTier>().ok()),
        positional.get(2).and_then(|raw| raw.parse::<PotentialTier>().ok()),
    ) else {
        eprintln!("{POTENTIAL_USAGE}");
        return 2;
    };
    let cube = match positional.get(3).copied() {
        None | Some("smart") => CubeChoice::default(),
        Some(raw) => match raw.parse::<CubeType>() {
            Ok(cube) => CubeChoice::Fixed { cube },
            Err(err) => {
                eprintln!("{err}");
                return 2;
            }
        },
    };

    let mut request = PotentialRequest::new(level, current, target);
    request.cube = cube;
    if let Some(lines) = parse_optional_u64(flag_value(args, "--lines"), "prime lines") {
        request = request.with_prime_lines(u8::try_from(lines).unwrap_or(u8::MAX));
    }
    request.cube_cost = parse_optional_u64(flag_value(args, "--cube-cost"), "cube cost");

    match engine.calculate_potential(&request, &option_overrides(args)) {
        Ok(result) if has_flag(args, "--table") => {
            print_potential_table(&result);
            0
        }
        Ok(result) => print_json(&result),
        Err(err) => {
            eprintln!("error: {err}");
            1
        }
    }
}

fn handle_batch(args: &[String], engine: &Engine) -> i32 {
    let Some(path) = positional_args(args).first().copied() else {
        eprintln!("{BATCH_USAGE}");
        return 2;
    };
    let mut plan = match load_batch_file(path) {
        Ok(plan) => plan,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };
    let overrides = option_overrides(args);
    plan.options.trials = overrides.trials.or(plan.options.trials);
    plan.options.seed = overrides.seed.or(plan.options.seed);

    let result = match engine.calculate_batch(&plan.items, &plan.options) {
        Ok(result) => result,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    if has_flag(args, "--csv") {
        return match write_batch_csv(&result, io::stdout().lock()) {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("failed to write csv: {err}");
                1
            }
        };
    }
    print_json(&result)
}

fn handle_tables(args: &[String]) -> i32 {
    let positional = positional_args(args);
    let system = match positional.first().map(|raw| raw.parse::<TierSystem>()) {
        Some(Ok(system)) => system,
        Some(Err(err)) => {
            eprintln!("{err}");
            return 2;
        }
        None => {
            eprintln!("{TABLES_USAGE}");
            return 2;
        }
    };

    if has_flag(args, "--check") {
        let problems = check_tables(system);
        if problems.is_empty() {
            println!("{system} tables consistent");
            return 0;
        }
        eprintln!("{system} tables: {} problem(s)", problems.len());
        for problem in problems {
            eprintln!("- {problem}");
        }
        return 1;
    }

    let Some(level) = positional.get(1).and_then(|raw| raw.parse::<u32>().ok()) else {
        eprintln!("{TABLES_USAGE}");
        return 2;
    };
    let rows = match tier_table(system, level) {
        Ok(rows) => rows,
        Err(err) => {
            eprintln!("error: {err}");
            return 1;
        }
    };
    let max = max_tier_for_level(level, system).unwrap_or_default();
    println!("{system} level {level}: max tier {max}");
    println!("tier\tcost\tsuccess\tdestroy\tsafeguard");
    for row in rows {
        println!(
            "{}\t{}\t{:.1}%\t{:.2}%\t{}",
            row.tier,
            format_meso(row.base_cost),
            row.success * 100.0,
            row.destruction * 100.0,
            if row.prevention_eligible { "yes" } else { "-" }
        );
    }
    0
}

fn handle_validate(args: &[String], config: &EngineConfig) -> i32 {
    let Some(path) = positional_args(args).first().copied() else {
        eprintln!("{VALIDATE_USAGE}");
        return 2;
    };
    let report = match validate_batch_file(path, config.max_trials) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };

    for diag in &report.diagnostics {
        println!("[{}] {}: {}", diag.severity, diag.context, diag.message);
    }
    let errors = report.count(ValidationSeverity::Error);
    let warnings = report.count(ValidationSeverity::Warning);
    if errors > 0 {
        eprintln!("validation failed: {errors} error(s), {warnings} warning(s)");
        1
    } else {
        println!("validation passed: {path} ({warnings} warning(s))");
        0
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize result: {err}");
            1
        }
    }
}

fn print_stage_table(request: &StarForceRequest, result: &AggregateResult) {
    println!(
        "level {} {} {} -> {}",
        request.item_level, request.tier_system, request.current_tier, request.target_tier
    );
    println!("tier\tattempt\tsuccess\tdestroy\tattempts\texpected");
    for stage in &result.stages {
        println!(
            "{}\t{}\t{:.1}%\t{:.2}%\t{:.2}\t{}",
            stage.tier,
            format_meso(stage.attempt_cost),
            stage.success_probability * 100.0,
            stage.destruction_probability * 100.0,
            stage.expected_attempts,
            format_meso(stage.expected_cost)
        );
    }
    print_summary(result);
}

fn print_potential_table(result: &PotentialResult) {
    let pick = if result.selection.recommended { " (recommended)" } else { "" };
    println!(
        "cube {}{pick} at {} each",
        result.selection.cube,
        format_meso(result.cube_cost)
    );
    println!("stage\tchance\tcubes\texpected");
    for stage in &result.stages {
        let label = match stage.kind {
            PotentialStageKind::TierUp { from, to } => format!("{from} -> {to}"),
            PotentialStageKind::PrimeLines { lines } => format!("{lines} prime lines"),
        };
        println!(
            "{label}\t{:.3}%\t{:.2}\t{}",
            stage.probability * 100.0,
            stage.expected_cubes,
            format_meso(stage.expected_cost)
        );
    }
    print_summary(&result.result);
}

fn print_summary(result: &AggregateResult) {
    println!("expected cost: {}", format_meso(result.expected_cost));
    println!("expected destructions: {:.3}", result.expected_destructions);
    for outcome in &result.percentiles {
        println!(
            "p{}: {} ({} destroyed)",
            outcome.percentile,
            format_meso(outcome.cost),
            outcome.destructions
        );
    }
}

/// Abbreviates meso with K/M/B/T suffixes for display.
pub fn format_meso(value: u64) -> String {
    const UNITS: [(u64, &str); 4] = [
        (1_000_000_000_000, "T"),
        (1_000_000_000, "B"),
        (1_000_000, "M"),
        (1_000, "K"),
    ];
    UNITS
        .iter()
        .find(|(unit, _)| value >= *unit)
        .map(|(unit, suffix)| format!("{:.2}{suffix}", value as f64 / *unit as f64))
        .unwrap_or_else(|| value.to_string())
}

fn option_overrides(args: &[String]) -> BatchOptions {
    BatchOptions {
        trials: parse_optional_u64(flag_value(args, "--trials"), "trials").map(|n| n as usize),
        seed: parse_optional_u64(flag_value(args, "--seed"), "seed"),
        ..BatchOptions::default()
    }
}

fn positional_args(args: &[String]) -> Vec<&str> {
    let mut positional = Vec::new();
    let mut rest = args.iter().skip(2);
    while let Some(arg) = rest.next() {
        if VALUE_FLAGS.contains(&arg.as_str()) {
            rest.next();
        } else if !arg.starts_with("--") {
            positional.push(arg.as_str());
        }
    }
    positional
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|index| args.get(index + 1))
}

fn parse_optional_u64(raw: Option<&String>, name: &str) -> Option<u64> {
    let value = raw?;
    match value.parse::<u64>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            eprintln!("invalid {name} '{value}', using the default");
            None
        }
    }
}

fn parse_u64_arg(raw: Option<&String>, name: &str, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
