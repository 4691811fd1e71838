// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the task scheduler.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("The task's program name is empty")]
    EmptyProgram,

    #[error("The task running '{program}' has no log file path")]
    NoLogPath { program: String },

    #[error("{num_failed}/{num_tasks} tasks in the stage failed; aborting")]
    StageFailed { num_failed: usize, num_tasks: usize },

    #[error("A scheduler worker thread panicked")]
    WorkerPanic,
}
