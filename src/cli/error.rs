// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all autocal-related errors. This should be the *only* error
//! enum that is publicly visible.

use thiserror::Error;

use crate::{pipeline::PipelineFileError, scheduler::SchedulerError};

/// The *only* publicly visible error from autocal.
#[derive(Error, Debug)]
pub enum AutocalError {
    /// An error parsing or validating a pipeline file.
    #[error("{0}")]
    PipelineFile(String),

    /// An error from the task scheduler, including a stage failing its check.
    #[error("{0}")]
    Scheduler(String),

    /// Generic I/O error.
    #[error("{0}")]
    Generic(String),
}

impl From<PipelineFileError> for AutocalError {
    fn from(e: PipelineFileError) -> Self {
        Self::PipelineFile(e.to_string())
    }
}

impl From<SchedulerError> for AutocalError {
    fn from(e: SchedulerError) -> Self {
        Self::Scheduler(e.to_string())
    }
}

impl From<std::io::Error> for AutocalError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
