use anyhow::Result;
use log::debug;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::Unpack;
use crate::benchmarks::args::InvocationArgs;
use crate::benchmarks::classpath::ClasspathAssembler;
use crate::benchmarks::descriptor::BenchmarkDescriptor;
use crate::benchmarks::family::{position_benchmark, BenchmarkFamily};
use crate::benchmarks::stages::{Stage, StagePlan};
use crate::error::BenchError;
use crate::path_utils::join_classpath;

/// Agent output consumed by later image builds
const AGENT_CONFIG_DIR: &str = "config";
/// File the instrumented binary writes its profile to
const PROFILE_FILE: &str = "default.iprof";
const INSTRUMENTED_SUFFIX: &str = "-instrumented";

/// One process to launch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl StageCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for StageCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executables used to run the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub java: String,
    pub native_image: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            native_image: "native-image".to_string(),
        }
    }
}

/// `-cp <classpath>` (when the family has one), VM args and `-jar <jar>`
fn launcher_args(classpath: &[PathBuf], jar: &Path, vm_args: Vec<String>) -> Vec<String> {
    let mut args = Vec::new();
    if !classpath.is_empty() {
        args.push("-cp".to_string());
        args.push(join_classpath(classpath));
    }
    args.extend(vm_args);
    args.push("-jar".to_string());
    args.push(path_arg(jar));
    args
}

/// JVM command line (without the `java` executable) for running exactly one
/// benchmark.
///
/// Zero or several benchmarks are rejected before anything is extracted.
pub fn create_command_line<U: Unpack>(
    family: &dyn BenchmarkFamily,
    assembler: &ClasspathAssembler<U>,
    benchmarks: &[String],
    args: &InvocationArgs,
) -> Result<Vec<String>> {
    let [benchmark] = benchmarks else {
        return Err(BenchError::BenchmarkCount {
            count: benchmarks.len(),
        }
        .into());
    };
    let descriptor = family.describe(benchmark)?;
    let run_args = family.postprocess_run_args(descriptor, args.run_args());

    let classpath = assembler.classpath_entries(family, descriptor)?;
    let jar = assembler.benchmark_jar(family)?;
    let mut line = launcher_args(&classpath, &jar, args.vm_args());
    line.extend(position_benchmark(
        family.benchmark_arg_position(),
        descriptor.name,
        run_args,
    ));
    Ok(line)
}

/// Files produced and consumed across the stages of one benchmark
#[derive(Debug, Clone)]
pub struct StageLayout {
    work_dir: PathBuf,
    benchmark: String,
}

impl StageLayout {
    pub fn new(work_dir: impl Into<PathBuf>, benchmark: &str) -> Self {
        Self {
            work_dir: work_dir.into(),
            benchmark: benchmark.to_string(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn agent_config_dir(&self) -> PathBuf {
        self.work_dir.join(AGENT_CONFIG_DIR)
    }

    pub fn profile(&self) -> PathBuf {
        self.work_dir.join(PROFILE_FILE)
    }

    pub fn binary(&self) -> PathBuf {
        self.work_dir.join(&self.benchmark)
    }

    pub fn instrumented_binary(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}{INSTRUMENTED_SUFFIX}", self.benchmark))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Builds the command of every stage in a plan for one benchmark
pub struct StageCommands<'a> {
    family: &'a dyn BenchmarkFamily,
    descriptor: &'a BenchmarkDescriptor,
    args: &'a InvocationArgs,
    plan: &'a StagePlan,
    toolchain: &'a Toolchain,
    layout: StageLayout,
    /// Launcher arguments for the JVM (all VM args) and for the image
    /// builder (system properties only); only computed when a stage of the
    /// plan starts from the jar
    launcher: Option<(Vec<String>, Vec<String>)>,
}

impl<'a> StageCommands<'a> {
    pub fn new<U: Unpack>(
        family: &'a dyn BenchmarkFamily,
        assembler: &ClasspathAssembler<U>,
        descriptor: &'a BenchmarkDescriptor,
        args: &'a InvocationArgs,
        plan: &'a StagePlan,
        toolchain: &'a Toolchain,
        layout: StageLayout,
    ) -> Result<Self> {
        let launcher = if plan.stages().iter().any(Stage::needs_classpath) {
            let classpath = assembler.classpath_entries(family, descriptor)?;
            let jar = assembler.benchmark_jar(family)?;
            Some((
                launcher_args(&classpath, &jar, args.vm_args()),
                launcher_args(&classpath, &jar, args.system_properties()),
            ))
        } else {
            None
        };
        Ok(Self {
            family,
            descriptor,
            args,
            plan,
            toolchain,
            layout,
            launcher,
        })
    }

    fn launcher(&self, for_jvm: bool) -> Vec<String> {
        match &self.launcher {
            Some((jvm, _)) if for_jvm => jvm.clone(),
            Some((_, image)) => image.clone(),
            None => Vec::new(),
        }
    }

    pub fn command_for(&self, stage: Stage) -> Result<StageCommand> {
        let command = match stage {
            Stage::Agent => self.agent()?,
            Stage::InstrumentImage => self.image_build(true),
            Stage::Image => self.image_build(false),
            Stage::InstrumentRun => {
                StageCommand::new(path_arg(&self.layout.instrumented_binary()))
                    .args(self.family.extra_profile_run_arg(self.descriptor, self.args))
                    .current_dir(self.layout.work_dir())
            }
            Stage::Run => {
                let mut run_args = self
                    .family
                    .postprocess_run_args(self.descriptor, self.args.run_args());
                run_args.extend(self.family.extra_run_arg(self.descriptor, self.args));
                StageCommand::new(path_arg(&self.layout.binary()))
                    .args(position_benchmark(
                        self.family.benchmark_arg_position(),
                        self.descriptor.name,
                        run_args,
                    ))
                    .current_dir(self.layout.work_dir())
            }
        };
        debug!("{stage} command: {command}");
        Ok(command)
    }

    fn agent(&self) -> Result<StageCommand> {
        let mut command = StageCommand::new(&self.toolchain.java).arg(format!(
            "-agentlib:native-image-agent=config-output-dir={}",
            path_arg(&self.layout.agent_config_dir())
        ));
        if !self.family.skip_agent_assertions(self.descriptor, self.args)? {
            command = command.arg("-ea");
        }
        Ok(command
            .args(self.launcher(true))
            .args(self.family.extra_agent_run_arg(self.descriptor, self.args))
            .current_dir(self.layout.work_dir()))
    }

    fn image_build(&self, instrumented: bool) -> StageCommand {
        let mut command = StageCommand::new(&self.toolchain.native_image)
            .args(self.family.extra_image_build_argument(self.descriptor, self.args));
        let output = if instrumented {
            command = command.arg("--pgo-instrument");
            self.layout.instrumented_binary()
        } else {
            if self.plan.contains(Stage::InstrumentRun) {
                command = command.arg(format!("--pgo={}", path_arg(&self.layout.profile())));
            }
            self.layout.binary()
        };
        if self.plan.contains(Stage::Agent) {
            command = command.arg(format!(
                "-H:ConfigurationFileDirectories={}",
                path_arg(&self.layout.agent_config_dir())
            ));
        }
        command
            .args(self.launcher(false))
            .arg("-o")
            .arg(path_arg(&output))
            .current_dir(self.layout.work_dir())
    }
}
