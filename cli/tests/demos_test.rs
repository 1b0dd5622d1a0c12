#[macro_use]
extern crate hamcrest;
use hamcrest::prelude::*;

use std::process::Command;

#[test]
fn prepend_log_puts_newest_entry_first() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    std::fs::write(&path, "old\n").unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_prepend_log"))
        .arg(&path)
        .args(["first", "second", "third"])
        .status()
        .unwrap();

    assert!(status.success());
    let content = std::fs::read_to_string(&path).unwrap();
    assert_that!(content.as_str(), is(equal_to("third\nsecond\nfirst\nold\n")));
}

#[test]
fn prepend_log_without_entries_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_prepend_log"))
        .arg(dir.path().join("log.txt"))
        .output()
        .unwrap();

    assert_that!(output.status.code(), is(equal_to(Some(1))));
    assert!(String::from_utf8_lossy(&output.stderr).starts_with("Usage:"));
}

#[test]
fn locked_writers_never_interleave_children() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_locked_writers"))
        .current_dir(dir.path())
        .args(["alpha", "beta", "gamma", "3"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_that!(lines.len(), is(equal_to(9)));
    for run in lines.chunks(3) {
        assert!(run.iter().all(|line| *line == run[0]), "interleaved: {lines:?}");
    }
    assert!(!dir.path().join("lockfile.lock").exists());
}

#[test]
fn locked_writers_needs_several_messages() {
    let output = Command::new(env!("CARGO_BIN_EXE_locked_writers"))
        .args(["alpha", "1"])
        .output()
        .unwrap();

    assert_that!(output.status.code(), is(equal_to(Some(1))));
}

#[test]
fn fork_writers_orders_child1_child2_parent() {
    let dir = tempfile::tempdir().unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_fork_writers"))
        .current_dir(dir.path())
        .args(["P", "a", "b", "2"])
        .status()
        .unwrap();

    assert!(status.success());
    let content = std::fs::read_to_string(dir.path().join("output.txt")).unwrap();
    assert_that!(content.as_str(), is(equal_to("aabbPP")));
}
