use anyhow::Result;
use nibench::{
    benchmarks::{create_command_line, ClasspathAssembler, InvocationArgs, Stage, StageDriver},
    command::SystemProcessRunner,
    config::{load_app_config, AppConfig},
    suites::SuiteRegistry,
    system_info::HostSnapshot,
};

use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info};
use std::{path::PathBuf, process};

const DEFAULT_CONFIG: &str = "config.yml";
const REPORT_FILE: &str = "report.json";
const SYSTEM_INFO_FILE: &str = "system_info.txt";

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Build and run JVM benchmark suites as native images"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Application config
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List suites, or the benchmarks of one suite
    List { suite: Option<String> },
    /// Print the classpath of a benchmark
    Classpath { suite: String, benchmark: String },
    /// Print the JVM command line that runs a benchmark
    CommandLine {
        suite: String,
        benchmark: String,
        /// VM args, then `--` and benchmark run args
        #[arg(last = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the stage plan selected by the given VM args
    Stages {
        suite: String,
        #[arg(last = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Show a benchmark's table entry and the arguments each stage receives
    Describe {
        suite: String,
        benchmark: String,
        #[arg(last = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run the stage plan of one benchmark
    Run {
        suite: String,
        benchmark: String,
        /// Keep going when this stage exits non-zero
        #[arg(long = "tolerate", value_name = "STAGE")]
        tolerate: Vec<Stage>,
        #[arg(last = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// Split `nibench ... -- <vm args> [-- <run args>]`
fn invocation_args(args: &[String]) -> InvocationArgs {
    InvocationArgs::parse(args.iter().cloned())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = load_app_config(&cli.config)?;
    let registry = SuiteRegistry::from_config(&config)?;
    let assembler = ClasspathAssembler::new(config.library_registry());

    match &cli.command {
        Commands::List { suite: None } => {
            for name in registry.names() {
                println!("{name}");
            }
        }
        Commands::List { suite: Some(suite) } => {
            let family = registry.find_suite(suite)?;
            for name in family.table().names() {
                println!("{name}");
            }
        }
        Commands::Classpath { suite, benchmark } => {
            let family = registry.find_suite(suite)?;
            println!("{}", assembler.build_classpath(family, benchmark)?);
        }
        Commands::CommandLine {
            suite,
            benchmark,
            args,
        } => {
            let family = registry.find_suite(suite)?;
            let line = create_command_line(
                family,
                &assembler,
                std::slice::from_ref(benchmark),
                &invocation_args(args),
            )?;
            println!("{}", line.join(" "));
        }
        Commands::Stages { suite, args } => {
            let family = registry.find_suite(suite)?;
            println!("{}", family.stage_plan(&invocation_args(args))?.names());
        }
        Commands::Describe {
            suite,
            benchmark,
            args,
        } => {
            let family = registry.find_suite(suite)?;
            let descriptor = family.describe(benchmark)?;
            let args = invocation_args(args);
            println!("{}", serde_json::to_string_pretty(descriptor)?);
            let hooks = [
                ("extra-agent-run-arg", family.extra_agent_run_arg(descriptor, &args)),
                ("extra-profile-run-arg", family.extra_profile_run_arg(descriptor, &args)),
                (
                    "extra-agent-profile-run-arg",
                    family.extra_agent_profile_run_arg(descriptor, &args),
                ),
                (
                    "extra-image-build-argument",
                    family.extra_image_build_argument(descriptor, &args),
                ),
                ("extra-run-arg", family.extra_run_arg(descriptor, &args)),
                (
                    "run-args",
                    family.postprocess_run_args(descriptor, args.run_args()),
                ),
            ];
            for (name, values) in hooks {
                println!("{name:<30}{}", values.join(" "));
            }
            println!(
                "{:<30}{}",
                "skip-agent-assertions",
                family.skip_agent_assertions(descriptor, &args)?
            );
        }
        Commands::Run {
            suite,
            benchmark,
            tolerate,
            args,
        } => {
            if !run_benchmark(&config, &registry, &assembler, suite, benchmark, tolerate, args)? {
                error!("{suite}/{benchmark} did not report success");
                process::exit(1);
            }
        }
    }

    Ok(())
}

fn run_benchmark(
    config: &AppConfig,
    registry: &SuiteRegistry,
    assembler: &ClasspathAssembler,
    suite: &str,
    benchmark: &str,
    tolerate: &[Stage],
    args: &[String],
) -> Result<bool> {
    let family = registry.find_suite(suite)?;
    let work_dir = config.work_dir(suite, benchmark);
    let runner = SystemProcessRunner;
    let driver = tolerate
        .iter()
        .fold(StageDriver::new(&runner, config.toolchain()), |driver, stage| {
            driver.tolerate(*stage)
        });

    let report = driver.execute(
        family,
        assembler,
        &[benchmark.to_string()],
        &invocation_args(args),
        &work_dir,
    )?;

    HostSnapshot::collect().write_to(&work_dir.join(SYSTEM_INFO_FILE))?;
    let report_path = work_dir.join(REPORT_FILE);
    report.export_json(&report_path)?;
    info!("Stage report written to {report_path:?}");
    Ok(report.success)
}
