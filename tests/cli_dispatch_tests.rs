use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_starforce")
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(bin())
        .args(args)
        .env_remove("STARFORCE_CONFIG")
        .env_remove("STARFORCE_TRIALS")
        .env("STARFORCE_LOG", "warn")
        .output()
        .expect("starforce should run")
}

fn unique_temp_path(name: &str, ext: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("starforce-{name}-{stamp}.{ext}"))
}

#[test]
fn missing_command_prints_usage() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage: starforce"));
}

#[test]
fn calculate_command_emits_json() {
    let output = run(&["calculate", "150", "10", "17", "--discount", "--trials", "100"]);
    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("calculate should emit json");
    assert_eq!(payload["trials"], 100);
    assert_eq!(payload["stages"].as_array().map(Vec::len), Some(7));
    assert!(payload["expected_cost"].as_u64().unwrap() > 0);
}

#[test]
fn calculate_command_prints_table() {
    let output = run(&["calculate", "160", "0", "12", "--table", "--trials", "50"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("expected cost:"));
    assert!(stdout.lines().any(|line| line.starts_with("11\t")));
}

#[test]
fn calculate_command_rejects_target_above_maximum() {
    let output = run(&["calculate", "160", "0", "24", "legacy"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("target tier 24 exceeds maximum 23 for item level 160"));
}

#[test]
fn calculate_command_requires_tiers() {
    let output = run(&["calculate", "150"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage: starforce calculate"));
}

#[test]
fn potential_command_emits_json() {
    let output = run(&["potential", "160", "rare", "epic", "red", "--trials", "50"]);
    assert_eq!(output.status.code(), Some(0));
    let payload: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("potential should emit json");
    assert_eq!(payload["selection"]["cube"], "red");
}

#[test]
fn tables_command_checks_both_systems() {
    for system in ["legacy", "extended"] {
        let output = run(&["tables", system, "--check"]);
        assert_eq!(output.status.code(), Some(0), "{system}");
    }
    let output = run(&["tables", "legacy", "150"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("max tier 23"));
}

#[test]
fn batch_command_writes_csv() {
    let path = unique_temp_path("plan", "yaml");
    fs::write(
        &path,
        "options:\n  trials: 50\nitems:\n  - id: hat\n    level: 150\n    star_force:\n      current_tier: 0\n      target_tier: 10\n",
    )
    .expect("should write plan");

    let output = run(&["batch", path.to_str().unwrap(), "--csv"]);
    let _ = fs::remove_file(&path);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert!(lines.next().is_some_and(|header| header.starts_with("id,name,included")));
    assert!(lines.next().is_some_and(|row| row.starts_with("hat,")));
    assert!(lines.next().is_some_and(|row| row.starts_with("portfolio,")));
}

#[test]
fn validate_command_fails_on_errors() {
    let path = unique_temp_path("invalid", "json");
    fs::write(
        &path,
        r#"[{"id": "belt", "level": 160, "star_force": {"current_tier": 0, "target_tier": 24}}]"#,
    )
    .expect("should write plan");

    let output = run(&["validate", path.to_str().unwrap()]);
    let _ = fs::remove_file(&path);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[error]"));
}

#[test]
fn validate_command_passes_clean_plan() {
    let path = unique_temp_path("valid", "json");
    fs::write(
        &path,
        r#"{"items": [{"id": "hat", "level": 150, "star_force": {"current_tier": 0, "target_tier": 10}}]}"#,
    )
    .expect("should write plan");

    let output = run(&["validate", path.to_str().unwrap()]);
    let _ = fs::remove_file(&path);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("validation passed"));
}
