// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Validate pipeline files without executing them.

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;

use super::{AutocalError, InfoPrinter};
use crate::pipeline::PipelineFile;

#[derive(Parser, Debug)]
pub(super) struct VerifyArgs {
    /// Path to the pipeline file(s) to be verified.
    #[clap(name = "PIPELINE_FILES", parse(from_os_str), required = true)]
    pipelines: Vec<PathBuf>,
}

impl VerifyArgs {
    pub(super) fn run(&self) -> Result<(), AutocalError> {
        for path in &self.pipelines {
            let pipeline = PipelineFile::read(path)?;

            let mut printer = InfoPrinter::new(path.display().to_string().into());
            printer.push_line(
                format!(
                    "{} stage(s), {} task(s)",
                    pipeline.stages.len(),
                    pipeline.num_tasks()
                )
                .into(),
            );
            let mut block = vec![];
            for stage in &pipeline.stages {
                let categories = stage
                    .tasks
                    .iter()
                    .counts_by(|t| t.category)
                    .into_iter()
                    .sorted_by_key(|(category, _)| category.to_string())
                    .map(|(category, count)| format!("{count} {category}"))
                    .join(", ");
                let mut line = format!("'{}': {} task(s)", stage.name, stage.tasks.len());
                if !categories.is_empty() {
                    line.push_str(&format!(" ({categories})"));
                }
                if !stage.check {
                    line.push_str(", failures tolerated");
                }
                block.push(line.into());
            }
            printer.push_block(block);
            printer.display();
        }
        Ok(())
    }
}
