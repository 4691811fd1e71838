// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Execute a pipeline file: every stage in order, one scheduler batch per
//! stage.

#[cfg(test)]
mod tests;

use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use itertools::Itertools;
use log::info;

use super::{AutocalError, InfoPrinter, Warn};
use crate::{pipeline::PipelineFile, scheduler::Scheduler};

#[derive(Parser, Debug)]
pub(super) struct RunArgs {
    /// Path to the pipeline file. Supported formats: toml, json.
    #[clap(name = "PIPELINE_FILE", parse(from_os_str))]
    pipeline: PathBuf,

    /// The number of tasks to run concurrently. The default is the number of
    /// logical CPU cores.
    #[clap(short, long)]
    jobs: Option<NonZeroUsize>,
}

impl RunArgs {
    pub(super) fn run(self, dry_run: bool) -> Result<(), AutocalError> {
        let pipeline = PipelineFile::read(&self.pipeline)?;
        let num_stages = pipeline.stages.len();
        info!(
            "Loaded '{}': {} stage(s), {} task(s)",
            self.pipeline.display(),
            num_stages,
            pipeline.num_tasks()
        );

        let mut scheduler = Scheduler::new(self.jobs, dry_run);
        for (i_stage, stage) in pipeline.stages.into_iter().enumerate() {
            let mut printer = InfoPrinter::new(
                format!("Stage {}/{num_stages}: {}", i_stage + 1, stage.name).into(),
            );
            let mut block = vec![format!("{} task(s)", stage.tasks.len()).into()];
            let counts = stage.tasks.iter().counts_by(|t| t.category);
            for (category, count) in counts
                .into_iter()
                .sorted_by_key(|(category, _)| category.to_string())
            {
                block.push(format!("{count} {category}").into());
            }
            printer.push_block(block);
            if !stage.check {
                printer.push_line("failures are tolerated in this stage".into());
            }
            printer.display();

            for spec in stage.tasks {
                scheduler.submit(spec.into())?;
            }
            // A failure here with the stage's check flag on aborts the whole
            // pipeline; later stages depend on this one's outputs.
            let stats = scheduler.run_and_wait(stage.check)?;
            if stats.num_failed > 0 {
                format!(
                    "Stage '{}': {}/{} task(s) failed (tolerated)",
                    stage.name, stats.num_failed, stats.num_tasks
                )
                .warn();
            }
            info!(
                "Stage '{}' finished in {:.1} s",
                stage.name,
                stats.wall_time.as_secs_f64()
            );
        }

        Ok(())
    }
}
