// tests/cli_tests.rs
//! Failure reporting of the command-line tools, no hardware needed.
#![cfg(feature = "cli")]

use std::process::{Command, Output};

const MISSING_BUS: &str = "/nonexistent/i2c-99";

fn run(exe: &str, args: &[&str]) -> Output {
    Command::new(exe)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to start binary")
}

fn assert_single_error_report(output: &Output) {
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Error:").count(), 1, "stderr was: {stderr}");
    assert!(stderr.contains(MISSING_BUS), "stderr was: {stderr}");
    assert!(!stderr.contains("BusOpen"), "debug formatting leaked: {stderr}");
}

#[test]
fn test_servo_angle_reports_error_once() {
    let output = run(
        env!("CARGO_BIN_EXE_servo-angle"),
        &["0", "90", "--bus", MISSING_BUS],
    );
    assert_single_error_report(&output);
}

#[test]
fn test_servo_hold_reports_error_once() {
    let output = run(
        env!("CARGO_BIN_EXE_servo-hold"),
        &["0", "90", "--wait", "0.1", "--bus", MISSING_BUS],
    );
    assert_single_error_report(&output);
}

#[test]
fn test_servo_hold_rejects_negative_wait() {
    let output = run(
        env!("CARGO_BIN_EXE_servo-hold"),
        &["0", "90", "--wait", "-1", "--bus", MISSING_BUS],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("wait must be"), "stderr was: {stderr}");
}

#[test]
fn test_spot_reports_debug_mode() {
    let output = run(env!("CARGO_BIN_EXE_spot"), &["--debug"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Debug mode enabled");
    let output = run(env!("CARGO_BIN_EXE_spot"), &[]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Debug mode disabled");
}
