use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use crate::archive::Unpack;
use crate::benchmarks::args::InvocationArgs;
use crate::benchmarks::classpath::ClasspathAssembler;
use crate::benchmarks::commands::{StageCommands, StageLayout, Toolchain};
use crate::benchmarks::family::{BenchmarkFamily, SUCCESS_MARKER};
use crate::benchmarks::report::{StageReport, StageResult};
use crate::benchmarks::stages::{Stage, StagePlan};
use crate::command::{ProcessOutput, ProcessRunner};
use crate::error::BenchError;
use crate::path_utils::ensure_directory;

/// Line announcing that every stage of `plan` completed
pub fn success_marker(plan: &StagePlan) -> String {
    format!("{SUCCESS_MARKER} {} (stages: {})", plan.last(), plan.names())
}

/// Runs a benchmark's stage plan, one process per stage, in order.
///
/// A stage exiting non-zero aborts the plan unless the stage was marked as
/// tolerated, in which case the failure is recorded in the report and the
/// next stage runs.
pub struct StageDriver<'a, R: ProcessRunner> {
    runner: &'a R,
    toolchain: Toolchain,
    tolerated: HashSet<Stage>,
}

impl<'a, R: ProcessRunner> StageDriver<'a, R> {
    pub fn new(runner: &'a R, toolchain: Toolchain) -> Self {
        Self {
            runner,
            toolchain,
            tolerated: HashSet::new(),
        }
    }

    /// Let `stage` fail without aborting the plan
    pub fn tolerate(mut self, stage: Stage) -> Self {
        self.tolerated.insert(stage);
        self
    }

    /// Build and run `benchmarks` (exactly one) of `family` in `work_dir`.
    ///
    /// Everything that can be rejected up front (benchmark count, unknown
    /// benchmark, stage plan) is checked before the first process starts.
    pub fn execute<U: Unpack>(
        &self,
        family: &dyn BenchmarkFamily,
        assembler: &ClasspathAssembler<U>,
        benchmarks: &[String],
        args: &InvocationArgs,
        work_dir: &Path,
    ) -> Result<StageReport> {
        let [benchmark] = benchmarks else {
            return Err(BenchError::BenchmarkCount {
                count: benchmarks.len(),
            }
            .into());
        };
        let descriptor = family.describe(benchmark)?;
        let plan = family.stage_plan(args)?;
        let patterns = family.success_patterns()?;
        ensure_directory(work_dir)?;

        let commands = StageCommands::new(
            family,
            assembler,
            descriptor,
            args,
            &plan,
            &self.toolchain,
            StageLayout::new(work_dir, descriptor.name),
        )?;

        info!(
            "Running {}/{} with stages {}",
            family.name(),
            descriptor.name,
            plan.names()
        );

        let mut output = String::new();
        let mut results = Vec::with_capacity(plan.stages().len());
        let mut completed_cleanly = true;

        for &stage in plan.stages() {
            let command = commands.command_for(stage)?;

            if !stage.is_image_build() {
                if let Some(generator) = family.load_generator(descriptor) {
                    info!("Starting load generator: {generator}");
                    self.runner.spawn_detached(&generator)?;
                }
            }

            info!("Running stage {stage}");
            debug!("{command}");
            let start = Instant::now();
            let process = self
                .runner
                .run(&command)
                .with_context(|| format!("Failed to run stage {stage}"))?;
            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

            write_stage_log(work_dir, stage, &process)?;
            output.push_str(&process.stdout);
            output.push_str(&process.stderr);

            let tolerated_failure = !process.success() && self.tolerated.contains(&stage);
            results.push(StageResult {
                stage,
                command: command.to_string(),
                exit_code: process.code,
                duration_ms,
                tolerated_failure,
            });

            if !process.success() {
                if !tolerated_failure {
                    return Err(BenchError::StageFailed {
                        stage: stage.to_string(),
                        code: process.code,
                    }
                    .into());
                }
                warn!("Stage {stage} failed with exit code {}, continuing", process.code);
                completed_cleanly = false;
            }
        }

        if completed_cleanly {
            let marker = success_marker(&plan);
            info!("{marker}");
            output.push_str(&marker);
            output.push('\n');
        }

        let matched_patterns: Vec<String> = patterns
            .iter()
            .filter(|pattern| pattern.is_match(&output))
            .map(|pattern| pattern.as_str().to_string())
            .collect();
        let success = !matched_patterns.is_empty();
        if !success {
            warn!("No success pattern matched the output of {}", descriptor.name);
        }

        Ok(StageReport {
            suite: family.name().to_string(),
            benchmark: descriptor.name.to_string(),
            requested: plan.stages().to_vec(),
            results,
            success,
            matched_patterns,
            output,
        })
    }
}

fn write_stage_log(work_dir: &Path, stage: Stage, process: &ProcessOutput) -> Result<()> {
    let path = work_dir.join(format!("{stage}.log"));
    std::fs::write(&path, format!("{}{}", process.stdout, process.stderr))
        .with_context(|| format!("Failed to write stage log {path:?}"))
}
