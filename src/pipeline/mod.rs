// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Declarative pipeline files. A pipeline file lists stages, each stage lists
//! the tasks to run in that batch, e.g.
//!
//! ```toml
//! [[stage]]
//! name = "average"
//! check = true
//!
//! [[stage.task]]
//! argv = ["NDPPP", "NDPPP-avg.parset", "msin=L123_SB000.MS"]
//! log = "logs/L123_SB000_avg.log"
//! category = "ndppp"
//! ```
//!
//! The whole file is validated up front so a typo in stage 7 surfaces before
//! stage 1 spends hours running.

mod error;

pub use error::PipelineFileError;

use std::{
    collections::HashSet,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use vec1::Vec1;

use crate::scheduler::{Category, Task};

lazy_static::lazy_static! {
    /// A comma-separated string slice of all supported pipeline-file
    /// extensions, for help and error text.
    pub static ref PIPELINE_FILE_EXTENSIONS: String = PipelineFileType::iter().join(", ");
}

#[derive(Debug, Display, EnumIter, EnumString, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum PipelineFileType {
    Toml,
    Json,
}

/// Serialisable mirror of [`Task`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub argv: Vec1<String>,
    pub log: PathBuf,
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_processors: Option<NonZeroUsize>,
}

impl From<TaskSpec> for Task {
    fn from(spec: TaskSpec) -> Task {
        Task {
            argv: spec.argv,
            log: spec.log,
            append: spec.append,
            category: spec.category,
            max_processors: spec.max_processors,
        }
    }
}

/// One batch of independent tasks, joined by a single wait before the next
/// stage starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub name: String,

    /// Abort the pipeline if any task in this stage fails. On by default; the
    /// original scripts turn it off for best-effort steps like fixing beam
    /// tables.
    #[serde(default = "default_check")]
    pub check: bool,

    /// An empty stage is allowed; it is just a barrier that does nothing.
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskSpec>,
}

fn default_check() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineFile {
    #[serde(rename = "stage")]
    pub stages: Vec1<StageSpec>,
}

impl PipelineFile {
    /// Read and validate a pipeline file, dispatching on its extension.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<PipelineFile, PipelineFileError> {
        let path = path.as_ref();
        let file_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.to_lowercase().parse::<PipelineFileType>().ok())
            .ok_or_else(|| PipelineFileError::UnhandledExtension {
                path: path.to_path_buf(),
            })?;

        let contents = fs::read_to_string(path).map_err(|e| PipelineFileError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let pipeline = match file_type {
            PipelineFileType::Toml => {
                toml::from_str(&contents).map_err(|e| PipelineFileError::Toml {
                    path: path.to_path_buf(),
                    source: e,
                })?
            }
            PipelineFileType::Json => {
                serde_json::from_str(&contents).map_err(|e| PipelineFileError::Json {
                    path: path.to_path_buf(),
                    source: e,
                })?
            }
        };

        Self::validate(&pipeline)?;
        Ok(pipeline)
    }

    /// Check the whole pipeline before anything runs: stage names must be
    /// unique, and every task must pass the scheduler's submission rules.
    fn validate(pipeline: &PipelineFile) -> Result<(), PipelineFileError> {
        let mut seen = HashSet::new();
        for stage in &pipeline.stages {
            if !seen.insert(stage.name.as_str()) {
                return Err(PipelineFileError::DuplicateStageName {
                    name: stage.name.clone(),
                });
            }
            for task_spec in &stage.tasks {
                Task::from(task_spec.clone())
                    .validate()
                    .map_err(|e| PipelineFileError::InvalidTask {
                        stage: stage.name.clone(),
                        source: e,
                    })?;
            }
        }
        Ok(())
    }

    pub fn num_tasks(&self) -> usize {
        self.stages.iter().map(|s| s.tasks.len()).sum()
    }
}
