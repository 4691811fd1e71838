// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading pipeline files.

use std::path::PathBuf;

use thiserror::Error;

use super::PIPELINE_FILE_EXTENSIONS;
use crate::scheduler::SchedulerError;

#[derive(Error, Debug)]
pub enum PipelineFileError {
    #[error(
        "'{path}' doesn't have a recognised pipeline-file extension (expected one of: {})",
        *PIPELINE_FILE_EXTENSIONS
    )]
    UnhandledExtension { path: PathBuf },

    #[error("Couldn't read pipeline file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Couldn't parse '{path}' as TOML: {source}")]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Couldn't parse '{path}' as JSON: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Stage names must be unique, but '{name}' appears more than once")]
    DuplicateStageName { name: String },

    #[error("Stage '{stage}' has an invalid task: {source}")]
    InvalidTask {
        stage: String,
        source: SchedulerError,
    },
}
