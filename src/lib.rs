// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Task scheduling for LOFAR interferometric calibration pipelines.

Calibration pipelines are long sequences of external-tool invocations (NDPPP,
BBS, LoSoTo and friends), run in stages of independent tasks. This crate
provides the scheduler that runs each stage with bounded parallelism and
per-task log files, and a declarative pipeline-file format on top of it.
 */

pub mod cli;
pub mod pipeline;
pub mod scheduler;

// Re-exports.
pub use cli::AutocalError;
pub use pipeline::{PipelineFile, StageSpec, TaskSpec};
pub use scheduler::{Category, Scheduler, SchedulerError, StageStats, Task};
