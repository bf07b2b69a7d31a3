use std::path::PathBuf;

use crate::benchmarks::args::{
    InvocationArgs, EXTRA_AGENT_PROFILE_RUN_ARG, EXTRA_AGENT_RUN_ARG, EXTRA_PROFILE_RUN_ARG,
};
use crate::benchmarks::descriptor::{BenchmarkDescriptor, DescriptorTable, NameTable, RuleKey};
use crate::benchmarks::family::{BenchmarkArgPosition, BenchmarkFamily, ClasspathLayout};
use crate::suites::dacapo::{with_iterations, COMPLETION_PATTERN, EXTRACTED_NAME, JAR_DIR};

const SCALA_LIBRARY: &[&str] = &["scala-library-2.8.0.jar"];

const EXCLUDE: NameTable = &[
    ("scalariform", SCALA_LIBRARY),
    ("scalap", SCALA_LIBRARY),
    ("scaladoc", SCALA_LIBRARY),
    ("scalatest", SCALA_LIBRARY),
    (
        "scalaxb",
        &[
            "scala-library-2.8.0.jar",
            "crimson-1.1.3.jar",
            "xercesImpl.jar",
            "xerces_2_5_0.jar",
            "xalan-2.6.0.jar",
            "xalan.jar",
        ],
    ),
    ("tmt", SCALA_LIBRARY),
    ("scalac", SCALA_LIBRARY),
];

const ADDITIONAL: NameTable = &[];

const INCOMPLETE_CLASSPATH: &[&str] = &["--allow-incomplete-classpath"];

const fn benchmark(
    name: &'static str,
    iterations: i32,
    resources: &'static [&'static str],
) -> BenchmarkDescriptor {
    BenchmarkDescriptor {
        iterations: Some(iterations),
        resources,
        ..BenchmarkDescriptor::new(name, name)
    }
}

const fn incomplete(descriptor: BenchmarkDescriptor) -> BenchmarkDescriptor {
    BenchmarkDescriptor {
        extra_image_build_args: INCOMPLETE_CLASSPATH,
        ..descriptor
    }
}

fn benchmarks() -> Vec<BenchmarkDescriptor> {
    vec![
        benchmark("scalac", 30, &["dat/scalac.zip"]),
        incomplete(benchmark("scalariform", 30, &["dat/scalariform.zip"])),
        benchmark("scalap", 120, &["dat/scalap.zip"]),
        benchmark("scaladoc", 30, &["dat/scaladoc.zip"]),
        incomplete(benchmark("scalatest", 60, &["dat/scalatest.zip"])),
        benchmark("scalaxb", 60, &["dat/scalaxb.zip"]),
        benchmark("kiama", 40, &["dat/kiama.zip"]),
        benchmark("factorie", 6, &["dat/factorie.zip"]),
        incomplete(benchmark("specs", 4, &["dat/specs.zip"])),
        benchmark("apparat", 5, &["dat/apparat.zip"]),
        incomplete(benchmark("tmt", 12, &["dat/tmt.zip"])),
    ]
}

pub struct ScalaDaCapo {
    table: DescriptorTable,
    substitutions: PathBuf,
}

impl ScalaDaCapo {
    /// `substitutions` is prepended to every classpath and must exist by
    /// the time one is assembled
    pub fn new(substitutions: PathBuf) -> Self {
        Self {
            table: DescriptorTable::new("scala-dacapo", benchmarks())
                .with_rules(RuleKey::Benchmark, EXCLUDE, ADDITIONAL),
            substitutions,
        }
    }

    fn benchmark_first(benchmark: &str, user: Vec<String>) -> Vec<String> {
        std::iter::once(benchmark.to_string()).chain(user).collect()
    }
}

impl BenchmarkFamily for ScalaDaCapo {
    fn name(&self) -> &'static str {
        "scala-dacapo-native-image"
    }

    fn bench_suite_name(&self) -> &'static str {
        "scala-dacapo"
    }

    fn table(&self) -> &DescriptorTable {
        &self.table
    }

    fn jar_library(&self) -> String {
        "DACAPO_SCALA".to_string()
    }

    fn classpath_layout(&self) -> ClasspathLayout {
        ClasspathLayout::ExtractedJars {
            extracted_name: EXTRACTED_NAME,
            jar_dir: JAR_DIR,
            prefix: Some(("substitutions for scala dacapo", self.substitutions.clone())),
        }
    }

    fn benchmark_arg_position(&self) -> BenchmarkArgPosition {
        BenchmarkArgPosition::BeforeRunArgs
    }

    fn completion_patterns(&self) -> Vec<&'static str> {
        vec![COMPLETION_PATTERN]
    }

    fn postprocess_run_args(
        &self,
        benchmark: &BenchmarkDescriptor,
        run_args: &[String],
    ) -> Vec<String> {
        with_iterations(benchmark, run_args)
    }

    fn extra_agent_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        Self::benchmark_first(benchmark.name, args.native_image_values(EXTRA_AGENT_RUN_ARG))
    }

    fn extra_profile_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        Self::benchmark_first(benchmark.name, args.native_image_values(EXTRA_PROFILE_RUN_ARG))
    }

    fn extra_agent_profile_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        Self::benchmark_first(
            benchmark.name,
            args.native_image_values(EXTRA_AGENT_PROFILE_RUN_ARG),
        )
    }
}
