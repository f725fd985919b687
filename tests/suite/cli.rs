//! Runs the `fanout` binary end to end.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;

fn fanout(home: &Path, args: &[&str], limit_env: Option<&str>) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_fanout"));
    command
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("FANOUT_LIMIT");
    if let Some(limit) = limit_env {
        command.env("FANOUT_LIMIT", limit);
    }
    command.output().expect("failed to launch fanout binary")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(ToString::to_string)
        .collect()
}

#[test]
fn prints_summary_for_default_run() {
    let home = tempfile::tempdir().unwrap();
    let output = fanout(home.path(), &["--tasks", "250"], None);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        stdout_lines(&output),
        vec!["Finished: counter=250 results=250", "failed=0"]
    );
}

#[test]
fn reports_injected_failures() {
    let home = tempfile::tempdir().unwrap();
    let output = fanout(
        home.path(),
        &["--tasks", "40", "--limit", "0", "--fail-every", "4"],
        None,
    );

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Finished: counter=40 results=40", "failed=10"]
    );
}

#[test]
fn honours_env_and_config_file() {
    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join(".fanout");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[pool]\nlimit = -4\n").unwrap();

    let output = fanout(home.path(), &["--tasks", "30"], Some("3"));
    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Finished: counter=30 results=30", "failed=0"]
    );
}

#[test]
fn broken_config_is_not_fatal() {
    let home = tempfile::tempdir().unwrap();
    let config_dir = home.path().join(".fanout");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("config.toml"), "[pool\n").unwrap();

    let output = fanout(home.path(), &["--tasks", "5"], None);
    assert!(output.status.success());
    assert_eq!(stdout_lines(&output)[0], "Finished: counter=5 results=5");
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to parse config"));
}

#[test]
fn zero_tasks_finishes_immediately() {
    let home = tempfile::tempdir().unwrap();
    let output = fanout(home.path(), &["--tasks", "0"], None);

    assert!(output.status.success());
    assert_eq!(
        stdout_lines(&output),
        vec!["Finished: counter=0 results=0", "failed=0"]
    );
}

#[test]
fn help_prints_usage() {
    let home = tempfile::tempdir().unwrap();
    let output = fanout(home.path(), &["--help"], None);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Usage: fanout"));
}

#[test]
fn unknown_flag_fails() {
    let home = tempfile::tempdir().unwrap();
    let output = fanout(home.path(), &["--bogus"], None);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown argument"));
}
