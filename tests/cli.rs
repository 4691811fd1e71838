// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against the autocal binary.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

use std::{fs, process::Output, str::from_utf8};

use assert_cmd::{output::OutputError, Command};
use indoc::formatdoc;
use tempfile::tempdir;

fn autocal() -> Command {
    Command::cargo_bin("autocal").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

#[test]
fn verify_accepts_a_well_formed_pipeline() {
    let tmp = tempdir().unwrap();
    let pipeline = tmp.path().join("pipeline.toml");
    fs::write(
        &pipeline,
        formatdoc! {r#"
            [[stage]]
            name = "average"

            [[stage.task]]
            argv = ["NDPPP", "NDPPP-avg.parset"]
            log = "avg.log"
            category = "ndppp"
        "#},
    )
    .unwrap();

    let cmd = autocal().arg("verify").arg(&pipeline).ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("average"));
    assert!(stdout.contains("1 ndppp"));
}

#[test]
fn verify_rejects_a_malformed_pipeline() {
    let tmp = tempdir().unwrap();
    let pipeline = tmp.path().join("pipeline.toml");
    fs::write(
        &pipeline,
        formatdoc! {r#"
            [[stage]]
            name = "solve"

            [[stage]]
            name = "solve"
        "#},
    )
    .unwrap();

    let cmd = autocal().arg("verify").arg(&pipeline).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("'solve' appears more than once"));
}

#[test]
fn run_writes_task_logs() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let pipeline = dir.join("pipeline.toml");
    fs::write(
        &pipeline,
        formatdoc! {r#"
            [[stage]]
            name = "greetings"

            [[stage.task]]
            argv = ["sh", "-c", "echo hello"]
            log = "{dir}/hello.log"

            [[stage.task]]
            argv = ["sh", "-c", "echo world"]
            log = "{dir}/world.log"
        "#, dir = dir.display()},
    )
    .unwrap();

    let cmd = autocal().arg("run").arg("--jobs=2").arg(&pipeline).ok();
    assert!(cmd.is_ok());
    assert_eq!(fs::read_to_string(dir.join("hello.log")).unwrap(), "hello\n");
    assert_eq!(fs::read_to_string(dir.join("world.log")).unwrap(), "world\n");
}

#[test]
fn run_fails_when_a_checked_stage_fails() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let pipeline = dir.join("pipeline.toml");
    fs::write(
        &pipeline,
        formatdoc! {r#"
            [[stage]]
            name = "breaks"

            [[stage.task]]
            argv = ["sh", "-c", "exit 1"]
            log = "{dir}/breaks.log"
        "#, dir = dir.display()},
    )
    .unwrap();

    let cmd = autocal().arg("run").arg(&pipeline).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("1/1 tasks in the stage failed"));
    // The task still ran and its log exists.
    assert!(dir.join("breaks.log").exists());
}

#[test]
fn dry_run_touches_nothing() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let pipeline = dir.join("pipeline.toml");
    fs::write(
        &pipeline,
        formatdoc! {r#"
            [[stage]]
            name = "would-run"

            [[stage.task]]
            argv = ["sh", "-c", "touch {dir}/marker"]
            log = "{dir}/would.log"
        "#, dir = dir.display()},
    )
    .unwrap();

    let cmd = autocal().arg("--dry-run").arg("run").arg(&pipeline).ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("would have run"));
    assert!(!dir.join("marker").exists());
    assert!(!dir.join("would.log").exists());
}
