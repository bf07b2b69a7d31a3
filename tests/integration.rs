use anyhow::Result;
use nibench::benchmarks::{
    create_command_line, ClasspathAssembler, InvocationArgs, Stage, StageCommand, StageDriver,
};
use nibench::command::{ProcessOutput, ProcessRunner};
use nibench::config::{load_app_config, AppConfig};
use nibench::error::BenchError;
use nibench::suites::SuiteRegistry;
use std::path::PathBuf;
use std::sync::Mutex;

use test_utils::TestInstall;

struct Harness {
    install: TestInstall,
    config: AppConfig,
    registry: SuiteRegistry,
    assembler: ClasspathAssembler,
}

impl Harness {
    fn new() -> Result<Self> {
        let install = TestInstall::new()?;
        let config = load_app_config(&install.config_path())?;
        let registry = SuiteRegistry::from_config(&config)?;
        let assembler = ClasspathAssembler::new(config.library_registry());
        Ok(Self {
            install,
            config,
            registry,
            assembler,
        })
    }

    fn classpath(&self, suite: &str, benchmark: &str) -> Result<Vec<PathBuf>> {
        let family = self.registry.find_suite(suite)?;
        let classpath = self.assembler.build_classpath(family, benchmark)?;
        Ok(classpath.split(':').map(PathBuf::from).collect())
    }

    fn command_line(
        &self,
        suite: &str,
        benchmarks: &[&str],
        args: &[&str],
    ) -> Result<Vec<String>> {
        let family = self.registry.find_suite(suite)?;
        let benchmarks: Vec<String> = benchmarks.iter().map(|b| b.to_string()).collect();
        create_command_line(
            family,
            &self.assembler,
            &benchmarks,
            &InvocationArgs::parse(args.iter().copied()),
        )
    }
}

#[test]
fn test_config_paths_expanded() -> Result<()> {
    let harness = Harness::new()?;
    let root = harness.install.root();

    assert!(harness.config.output_dir.starts_with(root));
    assert!(harness.config.output_dir.is_dir());
    assert_eq!(
        harness.config.libraries["DACAPO_SVM"],
        root.join("libs/dacapo.jar")
    );
    assert_eq!(harness.registry.names().count(), 4);
    Ok(())
}

#[test]
fn test_dacapo_h2_command_line() -> Result<()> {
    let harness = Harness::new()?;
    let extracted = harness.install.path("libs/dacapo.extracted");

    let line = harness.command_line(
        "dacapo-native-image",
        &["h2"],
        &[
            "-Xmx1g",
            "-Dnative-image.benchmark.stages=run",
            "--",
            "-s",
            "small",
        ],
    )?;

    let classpath = [
        extracted.clone(),
        extracted.join("jar/avrora-cvs.jar"),
        extracted.join("jar/h2.jar"),
        extracted.join("jar/junit.jar"),
    ]
    .iter()
    .map(|p| p.to_string_lossy().into_owned())
    .collect::<Vec<_>>()
    .join(":");
    let jar = harness.install.path("libs/dacapo.jar");

    assert_eq!(
        line,
        vec![
            "-cp".to_string(),
            classpath,
            "-Xmx1g".to_string(),
            "-jar".to_string(),
            jar.to_string_lossy().into_owned(),
            "h2".to_string(),
            "-n".to_string(),
            "25".to_string(),
            "-s".to_string(),
            "small".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn test_dacapo_resources_follow_jars() -> Result<()> {
    let harness = Harness::new()?;
    let extracted = harness.install.path("libs/dacapo.extracted");

    let classpath = harness.classpath("dacapo-native-image", "avrora")?;

    let unpacked = extracted.join("dat/avrora");
    assert_eq!(classpath.len(), 8);
    assert_eq!(classpath[0], extracted);
    assert_eq!(classpath[6], unpacked.join("avrora"));
    assert_eq!(classpath[7], unpacked.join("avrora/lib/helper.jar"));
    assert!(classpath.contains(&extracted.join("jar/derbynet.jar")));
    assert!(unpacked.join("avrora/config.txt").is_file());
    Ok(())
}

#[test]
fn test_repeated_assembly_is_stable() -> Result<()> {
    let harness = Harness::new()?;
    let first = harness.classpath("dacapo-native-image", "avrora")?;
    let second = harness.classpath("dacapo-native-image", "avrora")?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_renaissance_spark_uses_patched_breeze() -> Result<()> {
    let harness = Harness::new()?;
    let extracted = harness.install.path("libs/renaissance.extracted");
    let harness_dir = harness.install.path("libs/harness-2.11");

    assert_eq!(
        harness.classpath("renaissance-native-image", "als")?,
        vec![
            harness_dir.join("harness.jar"),
            harness_dir.join("scala-library-2.11.jar"),
            extracted.join("benchmarks/apache-spark/spark-core.jar"),
            harness.install.path("libs/breeze-patched.jar"),
        ]
    );

    let line = harness.command_line("renaissance-native-image", &["als"], &["--", "-r", "3"])?;
    assert_eq!(&line[line.len() - 3..], &["-r", "3", "als"]);
    Ok(())
}

#[test]
fn test_renaissance_bundled_harness() -> Result<()> {
    let harness = Harness::new()?;
    let extracted = harness.install.path("libs/renaissance.extracted");

    assert_eq!(
        harness.classpath("renaissance-native-image", "scrabble")?,
        vec![
            extracted.join("renaissance-harness/harness.jar"),
            extracted.join("renaissance-harness/scala-library-2.12.jar"),
            extracted.join("benchmarks/jdk-streams/streams.jar"),
        ]
    );
    Ok(())
}

#[test]
fn test_scala_dacapo_substitutions_first() -> Result<()> {
    let harness = Harness::new()?;
    let extracted = harness.install.path("libs/scala/dacapo.extracted");

    let classpath = harness.classpath("scala-dacapo-native-image", "scalap")?;
    assert_eq!(classpath[0], harness.install.path("libs/substitutions"));
    assert_eq!(classpath[1], extracted);
    assert!(!classpath.contains(&extracted.join("jar/scala-library-2.8.0.jar")));
    assert!(classpath.contains(&extracted.join("jar/scalap.jar")));
    Ok(())
}

#[test]
fn test_scala_dacapo_missing_substitutions() -> Result<()> {
    let harness = Harness::new()?;
    std::fs::remove_dir(harness.install.path("libs/substitutions"))?;

    let err = harness
        .classpath("scala-dacapo-native-image", "scalap")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::MissingPath { .. })
    ));
    assert!(!harness.install.path("libs/scala/dacapo.extracted").exists());
    Ok(())
}

#[test]
fn test_exactly_one_benchmark() -> Result<()> {
    let harness = Harness::new()?;

    for benchmarks in [&[][..], &["h2", "pmd"][..]] {
        let err = harness
            .command_line("dacapo-native-image", benchmarks, &[])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::BenchmarkCount { count }) if *count == benchmarks.len()
        ));
    }
    assert!(!harness.install.path("libs/dacapo.extracted").exists());
    Ok(())
}

#[test]
fn test_unknown_names() -> Result<()> {
    let harness = Harness::new()?;

    let err = harness.command_line("dacapo-native-image", &["kiama"], &[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::UnknownBenchmark { .. })
    ));

    let err = harness.command_line("specjvm-native-image", &["h2"], &[]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BenchError>(),
        Some(BenchError::UnknownSuite(_))
    ));
    Ok(())
}

/// Answers every stage with success and a fixed stdout
#[derive(Default)]
struct RecordingRunner {
    ran: Mutex<Vec<StageCommand>>,
    spawned: Mutex<Vec<StageCommand>>,
}

impl ProcessRunner for RecordingRunner {
    fn run(&self, command: &StageCommand) -> Result<ProcessOutput> {
        self.ran.lock().unwrap().push(command.clone());
        Ok(ProcessOutput {
            code: 0,
            stdout: "Startup completed in 9ms\n".to_string(),
            stderr: String::new(),
        })
    }

    fn spawn_detached(&self, command: &StageCommand) -> Result<()> {
        self.spawned.lock().unwrap().push(command.clone());
        Ok(())
    }
}

#[test]
fn test_shopcart_pipeline() -> Result<()> {
    let harness = Harness::new()?;
    let family = harness.registry.find_suite("shopcart-native-image")?;
    let work_dir = harness
        .config
        .work_dir("shopcart-native-image", "shopcart");
    let runner = RecordingRunner::default();

    let report = StageDriver::new(&runner, harness.config.toolchain()).execute(
        family,
        &harness.assembler,
        &["shopcart".to_string()],
        &InvocationArgs::default(),
        &work_dir,
    )?;

    assert!(report.success);
    assert_eq!(
        report.requested,
        vec![
            Stage::InstrumentImage,
            Stage::InstrumentRun,
            Stage::Image,
            Stage::Run
        ]
    );

    let ran = runner.ran.lock().unwrap();
    assert_eq!(ran[0].program, "/opt/graalvm/bin/native-image");
    assert_eq!(ran[0].working_dir.as_deref(), Some(work_dir.as_path()));

    // Load generator before each non-build stage
    let spawned = runner.spawned.lock().unwrap();
    assert_eq!(spawned.len(), 2);
    assert_eq!(spawned[0].to_string(), "/usr/bin/jmeter -n -t shopcart.jmx");

    let report_path = work_dir.join("report.json");
    report.export_json(&report_path)?;
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(report_path)?)?;
    assert_eq!(json["results"].as_array().map(Vec::len), Some(4));
    Ok(())
}
