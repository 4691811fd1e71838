// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests against running whole pipeline files.

use std::fs;

use indoc::formatdoc;
use tempfile::tempdir;

use super::*;

#[test]
fn stages_run_in_order_and_a_checked_failure_aborts() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let contents = formatdoc! {r#"
        [[stage]]
        name = "first"

        [[stage.task]]
        argv = ["sh", "-c", "echo one"]
        log = "{dir}/first.log"

        [[stage]]
        name = "breaks"

        [[stage.task]]
        argv = ["sh", "-c", "exit 1"]
        log = "{dir}/breaks.log"

        [[stage]]
        name = "never-reached"

        [[stage.task]]
        argv = ["sh", "-c", "touch {dir}/marker"]
        log = "{dir}/never.log"
    "#, dir = dir.display()};
    let pipeline = dir.join("pipeline.toml");
    fs::write(&pipeline, contents).unwrap();

    let args = RunArgs {
        pipeline,
        jobs: NonZeroUsize::new(2),
    };
    let result = args.run(false);
    assert!(matches!(result, Err(AutocalError::Scheduler(_))));

    // The first two stages ran; the third never started.
    assert_eq!(fs::read_to_string(dir.join("first.log")).unwrap(), "one\n");
    assert!(dir.join("breaks.log").exists());
    assert!(!dir.join("marker").exists());
    assert!(!dir.join("never.log").exists());
}

#[test]
fn unchecked_failures_do_not_abort() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let contents = formatdoc! {r#"
        [[stage]]
        name = "best-effort"
        check = false

        [[stage.task]]
        argv = ["sh", "-c", "exit 1"]
        log = "{dir}/bad.log"

        [[stage]]
        name = "follow-up"

        [[stage.task]]
        argv = ["sh", "-c", "echo reached"]
        log = "{dir}/reached.log"
    "#, dir = dir.display()};
    let pipeline = dir.join("pipeline.toml");
    fs::write(&pipeline, contents).unwrap();

    let args = RunArgs {
        pipeline,
        jobs: NonZeroUsize::new(1),
    };
    args.run(false).unwrap();
    assert_eq!(
        fs::read_to_string(dir.join("reached.log")).unwrap(),
        "reached\n"
    );
}

#[test]
fn dry_run_executes_nothing() {
    let tmp = tempdir().unwrap();
    let dir = tmp.path();
    let contents = formatdoc! {r#"
        [[stage]]
        name = "would-fail"

        [[stage.task]]
        argv = ["sh", "-c", "touch {dir}/marker; exit 1"]
        log = "{dir}/dry.log"
    "#, dir = dir.display()};
    let pipeline = dir.join("pipeline.toml");
    fs::write(&pipeline, contents).unwrap();

    let args = RunArgs {
        pipeline,
        jobs: None,
    };
    args.run(true).unwrap();
    assert!(!dir.join("marker").exists());
    assert!(!dir.join("dry.log").exists());
}

#[test]
fn a_bad_pipeline_file_fails_before_anything_runs() {
    let tmp = tempdir().unwrap();
    let pipeline = tmp.path().join("pipeline.toml");
    fs::write(&pipeline, "this is not a pipeline").unwrap();

    let args = RunArgs {
        pipeline,
        jobs: None,
    };
    assert!(matches!(
        args.run(false),
        Err(AutocalError::PipelineFile(_))
    ));
}
