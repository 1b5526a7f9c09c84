//! Integration tests for the sitedeploy CLI
//!
//! These run the actual binary. Anything that would reach the terminal UI
//! needs a tty, so only the paths that exit before it are covered here.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the binary to test
fn sitedeploy_cmd() -> Command {
    let mut cmd = Command::cargo_bin("sitedeploy").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_help_flag() {
    sitedeploy_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Deploy a static S3 website"))
        .stdout(predicate::str::contains("destroy"));
}

#[test]
fn test_version_flag() {
    sitedeploy_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sitedeploy"));
}

#[test]
fn test_invalid_engine_exits_with_fix() {
    // Fresh directory so no stray .env gets picked up
    let temp_dir = TempDir::new().unwrap();

    sitedeploy_cmd()
        .current_dir(temp_dir.path())
        .env("SITEDEPLOY_ENGINE", "terraform")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("Fix:"));
}

#[test]
fn test_invalid_tick_exits_before_ui() {
    let temp_dir = TempDir::new().unwrap();

    sitedeploy_cmd()
        .current_dir(temp_dir.path())
        .arg("destroy")
        .env("SITEDEPLOY_TICK_MS", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SITEDEPLOY_TICK_MS"));
}

#[test]
fn test_env_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(".env"),
        "SITEDEPLOY_REMOVE_STACK=maybe\n",
    )
    .unwrap();

    sitedeploy_cmd()
        .current_dir(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("SITEDEPLOY_REMOVE_STACK"));
}

#[test]
fn test_rust_log_enables_debug_output() {
    let temp_dir = TempDir::new().unwrap();

    sitedeploy_cmd()
        .current_dir(temp_dir.path())
        .arg("destroy")
        .env("RUST_LOG", "debug")
        .env("SITEDEPLOY_ENGINE", "terraform")
        .assert()
        .failure()
        .stderr(predicate::str::contains("selected mode: destroy"));
}

#[test]
fn test_default_log_level_is_warn() {
    let temp_dir = TempDir::new().unwrap();

    sitedeploy_cmd()
        .current_dir(temp_dir.path())
        .env_remove("RUST_LOG")
        .env("SITEDEPLOY_ENGINE", "terraform")
        .assert()
        .failure()
        .stderr(predicate::str::contains("selected mode").not());
}
