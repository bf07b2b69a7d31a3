use anyhow::{Context, Result};
use regex::Regex;
use std::path::PathBuf;

use crate::benchmarks::args::{
    InvocationArgs, EXTRA_AGENT_PROFILE_RUN_ARG, EXTRA_AGENT_RUN_ARG, EXTRA_IMAGE_BUILD_ARGUMENT,
    EXTRA_PROFILE_RUN_ARG, EXTRA_RUN_ARG, SKIP_AGENT_ASSERTIONS,
};
use crate::benchmarks::commands::StageCommand;
use crate::benchmarks::descriptor::{BenchmarkDescriptor, DescriptorTable};
use crate::benchmarks::stages::StagePlan;

/// Literal phrase announcing that every requested stage completed
pub const SUCCESS_MARKER: &str = "Successfully finished the last specified stage:";

/// Regex recognising the success marker line
pub fn success_marker_pattern() -> Result<Regex> {
    Regex::new(&format!("(?m){}.*$", regex::escape(SUCCESS_MARKER)))
        .context("Failed to compile success marker pattern")
}

/// How a family lays out its benchmark classpath
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClasspathLayout {
    /// A harness project linked ahead of the benchmark's group jars. The
    /// harness ships inside the archive for `bundled_harness_version` and
    /// comes from `harness_library` for every other version.
    HarnessAndGroup {
        extracted_name: &'static str,
        bundled_harness_version: u32,
        harness_library: String,
    },
    /// Extraction root, the archive's jar directory and the benchmark's
    /// resource bundles, optionally preceded by a directory that must exist
    ExtractedJars {
        extracted_name: &'static str,
        jar_dir: &'static str,
        prefix: Option<(&'static str, PathBuf)>,
    },
    /// The benchmark jar alone, no `-cp`
    JarOnly,
}

/// Where the benchmark name goes relative to the run args on a JVM
/// command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchmarkArgPosition {
    BeforeRunArgs,
    AfterRunArgs,
    Omitted,
}

/// A native-image benchmark family.
///
/// Families supply their table, layout and the handful of hooks that differ
/// from the defaults below; everything else is shared.
pub trait BenchmarkFamily: Send + Sync {
    /// Suite name the framework registers, e.g. `dacapo-native-image`
    fn name(&self) -> &'static str;

    /// Name of the underlying benchmark suite, e.g. `dacapo`
    fn bench_suite_name(&self) -> &'static str;

    fn table(&self) -> &DescriptorTable;

    /// Library holding the jar launched with `-jar`
    fn jar_library(&self) -> String;

    fn classpath_layout(&self) -> ClasspathLayout;

    fn benchmark_arg_position(&self) -> BenchmarkArgPosition;

    fn describe(&self, benchmark: &str) -> Result<&BenchmarkDescriptor> {
        self.table().describe(benchmark)
    }

    fn stage_plan(&self, args: &InvocationArgs) -> Result<StagePlan> {
        StagePlan::from_args(args)
    }

    /// Family-specific patterns for a successful benchmark run
    fn completion_patterns(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Completion patterns plus the stage marker
    fn success_patterns(&self) -> Result<Vec<Regex>> {
        let mut patterns = self
            .completion_patterns()
            .into_iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid success pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        patterns.push(success_marker_pattern()?);
        Ok(patterns)
    }

    /// Run args of the final JVM or image run, before the benchmark name is
    /// positioned
    fn postprocess_run_args(
        &self,
        _benchmark: &BenchmarkDescriptor,
        run_args: &[String],
    ) -> Vec<String> {
        run_args.to_vec()
    }

    fn extra_agent_run_arg(
        &self,
        _benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        args.native_image_values(EXTRA_AGENT_RUN_ARG)
    }

    fn extra_profile_run_arg(
        &self,
        _benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        args.native_image_values(EXTRA_PROFILE_RUN_ARG)
    }

    fn extra_agent_profile_run_arg(
        &self,
        _benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        args.native_image_values(EXTRA_AGENT_PROFILE_RUN_ARG)
    }

    /// Compatibility workarounds from the table followed by user arguments
    fn extra_image_build_argument(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        benchmark
            .extra_image_build_args
            .iter()
            .map(|arg| arg.to_string())
            .chain(args.native_image_values(EXTRA_IMAGE_BUILD_ARGUMENT))
            .collect()
    }

    fn extra_run_arg(&self, benchmark: &BenchmarkDescriptor, args: &InvocationArgs) -> Vec<String> {
        benchmark
            .extra_run_args
            .iter()
            .map(|arg| arg.to_string())
            .chain(args.native_image_values(EXTRA_RUN_ARG))
            .collect()
    }

    /// User choice when given, otherwise the table default
    fn skip_agent_assertions(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Result<bool> {
        Ok(args
            .native_image_flag(SKIP_AGENT_ASSERTIONS)?
            .unwrap_or(benchmark.skip_agent_assertions))
    }

    /// Auxiliary process started in the background before each run stage
    fn load_generator(&self, _benchmark: &BenchmarkDescriptor) -> Option<StageCommand> {
        None
    }
}

/// Put the benchmark name around `run_args` the way `position` says
pub fn position_benchmark(
    position: BenchmarkArgPosition,
    benchmark: &str,
    run_args: Vec<String>,
) -> Vec<String> {
    match position {
        BenchmarkArgPosition::BeforeRunArgs => {
            std::iter::once(benchmark.to_string()).chain(run_args).collect()
        }
        BenchmarkArgPosition::AfterRunArgs => {
            let mut args = run_args;
            args.push(benchmark.to_string());
            args
        }
        BenchmarkArgPosition::Omitted => run_args,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_marker_pattern() {
        let pattern = success_marker_pattern().unwrap();
        let output =
            "build done\nSuccessfully finished the last specified stage: run (stages: image,run)\n";
        assert!(pattern.is_match(output));
        assert!(!pattern.is_match("successfully finished the last specified stage: run"));
    }

    #[test]
    fn test_position_benchmark() {
        let run = vec!["-n".to_string(), "3".to_string()];
        assert_eq!(
            position_benchmark(BenchmarkArgPosition::BeforeRunArgs, "h2", run.clone()),
            vec!["h2", "-n", "3"]
        );
        assert_eq!(
            position_benchmark(BenchmarkArgPosition::AfterRunArgs, "als", run.clone()),
            vec!["-n", "3", "als"]
        );
        assert_eq!(
            position_benchmark(BenchmarkArgPosition::Omitted, "shopcart", run),
            vec!["-n", "3"]
        );
    }
}
