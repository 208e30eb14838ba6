//! Recovery from damaged store and config files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lift").unwrap();
    cmd.env("XDG_CONFIG_HOME", temp_dir.path().join("config"))
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"));
    cmd
}

#[test]
fn test_corrupted_store_moved_aside() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("workouts.json"), "{\"exercises\": [ truncated").unwrap();

    cli(&temp_dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("default exercises"));

    let aside = fs::read_to_string(data_dir.join("workouts.json.corrupt")).unwrap();
    assert!(aside.contains("truncated"));

    // Fresh store was written and is usable
    let content = fs::read_to_string(data_dir.join("workouts.json")).unwrap();
    let store: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert!(!store["exercises"].as_array().unwrap().is_empty());
}

#[test]
fn test_empty_store_file_recovers() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("workouts.json"), "").unwrap();

    cli(&temp_dir)
        .args(["exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("bad.toml");
    fs::write(&config_path, "[timer]\ndefault_duration_secs = 0\n").unwrap();

    cli(&temp_dir)
        .arg("--config")
        .arg(&config_path)
        .args(["exercise", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_malformed_config_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_dir = temp_dir.path().join("config").join("lift");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[units\nkg_step = ").unwrap();

    cli(&temp_dir)
        .args(["exercise", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML error"));
}

#[test]
fn test_config_default_unit_applies() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("lift.toml");
    fs::write(&config_path, "[units]\ndefault_unit = \"lb\"\n").unwrap();

    cli(&temp_dir).arg("init").assert().success();
    cli(&temp_dir)
        .arg("--config")
        .arg(&config_path)
        .args(["set", "add", "Squat", "--weight", "225", "--reps", "5", "--date", "2025-08-22"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#1 225.0 lb x 5"));
}
