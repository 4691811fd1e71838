// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The pipeline task scheduler. Pipeline code describes *what* external
//! command to run; the scheduler decides *how* and *when* it runs.
//!
//! Tasks accumulate in a FIFO queue via [`Scheduler::submit`] and are executed
//! as one batch ("stage") by [`Scheduler::run_and_wait`], which acts as a
//! barrier: it returns only once every task in the stage has terminated.
//! Tasks within a stage are assumed independent of one another; ordering
//! between stages comes purely from the caller issuing `run_and_wait` before
//! submitting the next stage's tasks.

mod error;

pub use error::SchedulerError;

use std::{
    fs::{File, OpenOptions},
    io::Write,
    num::NonZeroUsize,
    path::PathBuf,
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::unbounded;
use itertools::Itertools;
use log::{debug, error, info, trace, warn};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use vec1::Vec1;

/// A tag describing which external tool family a task belongs to. Only used
/// for logging and diagnostics; the scheduler treats all tasks the same way.
#[derive(
    Debug, Default, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq, Hash, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    Ndppp,
    Bbs,
    Losoto,
    Python,
}

/// One external-process invocation: an argv array plus a destination for the
/// process's combined stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// The program and its arguments. Always spawned directly; no shell is
    /// involved, so there is nothing to quote or escape.
    pub argv: Vec1<String>,

    /// Where the process's stdout and stderr go.
    pub log: PathBuf,

    /// Append to the log file rather than truncating it. Multiple tasks may
    /// share a log path this way, but their writes are serialised only by
    /// process-exit ordering.
    pub append: bool,

    /// Diagnostics tag.
    pub category: Category,

    /// An upper limit on the threads the invoked tool itself should use,
    /// exported to the child as `OMP_NUM_THREADS` (clamped to the worker-pool
    /// size). Most LOFAR tools (e.g. NDPPP) respect this.
    pub max_processors: Option<NonZeroUsize>,
}

impl Task {
    pub fn new<P: Into<PathBuf>>(argv: Vec1<String>, log: P) -> Task {
        Task {
            argv,
            log: log.into(),
            append: false,
            category: Category::default(),
            max_processors: None,
        }
    }

    /// Check a task description before any resources are committed to it.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.argv.first().trim().is_empty() {
            return Err(SchedulerError::EmptyProgram);
        }
        if self.log.as_os_str().is_empty() {
            return Err(SchedulerError::NoLogPath {
                program: self.argv.first().clone(),
            });
        }
        Ok(())
    }

    /// The command line as a human would type it, for log messages.
    fn display_command(&self) -> String {
        self.argv.iter().join(" ")
    }
}

/// Aggregate results for one executed stage.
#[derive(Debug, Clone, Copy)]
pub struct StageStats {
    pub num_tasks: usize,
    pub num_failed: usize,
    pub wall_time: Duration,
}

/// What one worker reports back about one task.
#[derive(Debug)]
struct TaskReport {
    command: String,
    category: Category,
    failure: Option<String>,
}

/// A batch scheduler for external-tool invocations with bounded concurrency.
///
/// Created once per pipeline run and reused across stages. There is no retry,
/// no per-task timeout and no cancellation: a dispatched task runs until its
/// process exits.
pub struct Scheduler {
    slots: NonZeroUsize,
    dry: bool,
    queue: Vec<Task>,
}

impl Scheduler {
    /// `slots` bounds how many tasks run concurrently; the default is the
    /// host's available parallelism. `dry` records tasks instead of running
    /// them.
    pub fn new(slots: Option<NonZeroUsize>, dry: bool) -> Scheduler {
        let slots = slots.unwrap_or_else(|| {
            thread::available_parallelism().unwrap_or_else(|_| NonZeroUsize::new(1).unwrap())
        });
        debug!(
            "Scheduler created with {slots} worker slot(s){}",
            if dry { ", dry run" } else { "" }
        );
        Scheduler {
            slots,
            dry,
            queue: vec![],
        }
    }

    pub fn num_slots(&self) -> NonZeroUsize {
        self.slots
    }

    /// Enqueue a task for the current stage. Nothing is spawned until
    /// [`Scheduler::run_and_wait`] is called. Fails only if the task
    /// description itself is malformed.
    pub fn submit(&mut self, task: Task) -> Result<(), SchedulerError> {
        task.validate()?;
        trace!(
            "Queued {} task: {}",
            task.category,
            task.display_command()
        );
        self.queue.push(task);
        Ok(())
    }

    /// Execute every queued task, at most `num_slots` at a time, and block
    /// until all of them have terminated. Dispatch order is submission order;
    /// completion order sits with the operating system.
    ///
    /// A task "fails" when its process exits non-zero (or cannot be spawned at
    /// all). With `check` set, any failure makes the whole stage fail, but
    /// only after the batch has drained; in-flight siblings are never killed,
    /// because aborting a long calibration run can corrupt its output files.
    /// Without `check`, failures are logged and tolerated.
    ///
    /// The queue is left empty for the next stage regardless of outcome.
    pub fn run_and_wait(&mut self, check: bool) -> Result<StageStats, SchedulerError> {
        let tasks = std::mem::take(&mut self.queue);
        let num_tasks = tasks.len();
        let start = Instant::now();

        if self.dry {
            for task in &tasks {
                info!(
                    "Dry run; would have run {} task: {} (log: {})",
                    task.category,
                    task.display_command(),
                    task.log.display()
                );
            }
            return Ok(StageStats {
                num_tasks,
                num_failed: 0,
                wall_time: start.elapsed(),
            });
        }

        debug!(
            "Running a stage of {num_tasks} task(s) over {} slot(s)",
            self.slots
        );

        let reports = run_pool(tasks, self.slots, run_task)?;

        let num_failed = reports.iter().filter(|r| r.failure.is_some()).count();
        let stats = StageStats {
            num_tasks,
            num_failed,
            wall_time: start.elapsed(),
        };
        debug!(
            "Stage drained: {num_tasks} task(s), {num_failed} failed, {:.1} s",
            stats.wall_time.as_secs_f64()
        );

        if num_failed > 0 {
            for report in reports.iter().filter(|r| r.failure.is_some()) {
                let reason = report.failure.as_deref().unwrap_or("unknown");
                if check {
                    error!("{} task failed ({reason}): {}", report.category, report.command);
                } else {
                    warn!(
                        "{} task failed ({reason}), continuing anyway: {}",
                        report.category, report.command
                    );
                }
            }
            if check {
                return Err(SchedulerError::StageFailed {
                    num_failed,
                    num_tasks,
                });
            }
        }

        Ok(stats)
    }
}

/// Drain `tasks` through a fixed pool of worker threads, at most `slots` of
/// them at a time. Dispatch order is the order of `tasks`; workers pulling
/// off a shared channel gives FIFO dispatch and bounds concurrency to the
/// number of workers.
fn run_pool<F>(
    tasks: Vec<Task>,
    slots: NonZeroUsize,
    run: F,
) -> Result<Vec<TaskReport>, SchedulerError>
where
    F: Fn(Task, NonZeroUsize) -> TaskReport + Sync,
{
    let (tx_task, rx_task) = unbounded::<Task>();
    let (tx_report, rx_report) = unbounded::<TaskReport>();
    for task in tasks {
        tx_task.send(task).expect("task receiver is alive");
    }
    drop(tx_task);

    thread::scope(|scope| {
        let mut workers = Vec::with_capacity(slots.get());
        for i in 0..slots.get() {
            let rx_task = rx_task.clone();
            let tx_report = tx_report.clone();
            let run = &run;
            let handle = thread::Builder::new()
                .name(format!("task-slot-{i}"))
                .spawn_scoped(scope, move || {
                    while let Ok(task) = rx_task.recv() {
                        let report = run(task, slots);
                        if tx_report.send(report).is_err() {
                            break;
                        }
                    }
                })
                .expect("OS can create threads");
            workers.push(handle);
        }
        drop(tx_report);
        drop(rx_task);

        // Collect until every worker has dropped its sender, i.e. until the
        // batch has drained.
        let reports: Vec<TaskReport> = rx_report.iter().collect();

        // Join the workers ourselves: letting the scope do it would re-raise
        // a worker panic instead of letting us report it as an error.
        let mut panicked = false;
        for handle in workers {
            if handle.join().is_err() {
                panicked = true;
            }
        }
        if panicked {
            Err(SchedulerError::WorkerPanic)
        } else {
            Ok(reports)
        }
    })
}

/// Run one task to completion on the calling thread: open its log, spawn the
/// child with stdout and stderr redirected there, wait for it to exit. Any
/// failure is written to the task's log before it is reported upward.
fn run_task(task: Task, slots: NonZeroUsize) -> TaskReport {
    let command = task.display_command();
    let category = task.category;
    trace!("Dispatching {category} task: {command}");

    let failure = match execute(&task, slots) {
        Ok(None) => None,
        Ok(Some(reason)) => Some(reason),
        Err(e) => {
            // The log file couldn't be opened, so there is nowhere but the
            // program log to record this.
            Some(e)
        }
    };

    TaskReport {
        command,
        category,
        failure,
    }
}

/// `Ok(None)` is success; `Ok(Some(reason))` is a failed invocation (non-zero
/// exit, or no process at all), already recorded in the task's log;
/// `Err(reason)` means the log itself couldn't be set up.
fn execute(task: &Task, slots: NonZeroUsize) -> Result<Option<String>, String> {
    let mut log_file = open_log(task)?;

    let stdout = clone_log_handle(task, &log_file)?;
    let stderr = clone_log_handle(task, &log_file)?;
    let mut command = Command::new(task.argv.first());
    command
        .args(task.argv.iter().skip(1))
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    if let Some(max) = task.max_processors {
        command.env("OMP_NUM_THREADS", max.min(slots).to_string());
    }

    let status = match command.status() {
        Ok(status) => status,
        Err(e) => {
            let reason = format!("couldn't spawn '{}': {e}", task.argv.first());
            record_failure(task, &mut log_file, &reason);
            return Ok(Some(reason));
        }
    };

    if status.success() {
        Ok(None)
    } else {
        record_failure(task, &mut log_file, &format!("command failed with {status}"));
        Ok(Some(status.to_string()))
    }
}

/// Record a failure in the task's own log before it is reported upward.
fn record_failure(task: &Task, log_file: &mut File, reason: &str) {
    if let Err(e) = writeln!(log_file, "autocal: {reason}") {
        warn!(
            "Couldn't record failure in log file '{}': {e}",
            task.log.display()
        );
    }
}

fn open_log(task: &Task) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .append(task.append)
        .truncate(!task.append)
        .open(&task.log)
        .map_err(|e| format!("couldn't open log file '{}': {e}", task.log.display()))
}

fn clone_log_handle(task: &Task, log_file: &File) -> Result<File, String> {
    log_file
        .try_clone()
        .map_err(|e| format!("couldn't duplicate log handle '{}': {e}", task.log.display()))
}
