use anyhow::Result;

use crate::benchmarks::args::{
    InvocationArgs, EXTRA_AGENT_PROFILE_RUN_ARG, EXTRA_AGENT_RUN_ARG, EXTRA_PROFILE_RUN_ARG,
};
use crate::benchmarks::classpath::check_version;
use crate::benchmarks::descriptor::{BenchmarkDescriptor, DescriptorTable, NameTable, RuleKey};
use crate::benchmarks::family::{BenchmarkArgPosition, BenchmarkFamily, ClasspathLayout};

/// Releases with a cross-compiled Scala 2.11 harness available
pub const AVAILABLE_VERSIONS: &[&str] = &["0.9.0", "0.10.0", "0.11.0"];
pub const DEFAULT_VERSION: &str = "0.11.0";

/// Scala version whose harness ships inside the Renaissance jar
const BUNDLED_HARNESS_SCALA: u32 = 12;

const INCOMPLETE_CLASSPATH_UNSUPPORTED_AT_RUNTIME: &[&str] = &[
    "--allow-incomplete-classpath",
    "--report-unsupported-elements-at-runtime",
];

const EXCLUDE: NameTable = &[("apache-spark", &["breeze_2.11-0.11.2.jar"])];
const ADDITIONAL: NameTable = &[("apache-spark", &["SPARK_BREEZE_PATCHED"])];

const fn benchmark(name: &'static str, group: &'static str, scala: u32) -> BenchmarkDescriptor {
    BenchmarkDescriptor {
        version: Some(scala),
        ..BenchmarkDescriptor::new(name, group)
    }
}

const fn spark(name: &'static str) -> BenchmarkDescriptor {
    benchmark(name, "apache-spark", 11)
}

/// Spark benchmarks that only build with reflection gaps tolerated
const fn spark_incomplete(name: &'static str) -> BenchmarkDescriptor {
    BenchmarkDescriptor {
        extra_image_build_args: INCOMPLETE_CLASSPATH_UNSUPPORTED_AT_RUNTIME,
        ..spark(name)
    }
}

fn benchmarks() -> Vec<BenchmarkDescriptor> {
    vec![
        benchmark("akka-uct", "actors", 11),
        benchmark("reactors", "actors", 11),
        benchmark("scala-kmeans", "scala-stdlib", 12),
        benchmark("mnemonics", "jdk-streams", 12),
        benchmark("par-mnemonics", "jdk-streams", 12),
        benchmark("rx-scrabble", "rx", 12),
        benchmark("scrabble", "jdk-streams", 12),
        spark("als"),
        spark_incomplete("chi-square"),
        spark_incomplete("dec-tree"),
        spark("gauss-mix"),
        spark_incomplete("log-regression"),
        spark_incomplete("movie-lens"),
        spark_incomplete("naive-bayes"),
        spark_incomplete("page-rank"),
        benchmark("db-shootout", "database", 11),
        benchmark("dotty", "scala-dotty", 12),
        benchmark("finagle-chirper", "twitter-finagle", 11),
        BenchmarkDescriptor {
            extra_image_build_args: &["--allow-incomplete-classpath"],
            ..benchmark("finagle-http", "twitter-finagle", 11)
        },
        benchmark("fj-kmeans", "jdk-concurrent", 12),
        benchmark("future-genetic", "jdk-concurrent", 12),
        benchmark("neo4j-analytics", "neo4j", 11),
        benchmark("philosophers", "scala-stm", 12),
        benchmark("scala-stm-bench7", "scala-stm", 12),
    ]
}

/// Renaissance benchmarks built from the extracted fat jar: the benchmark's
/// group jars linked against a harness compiled for the same Scala version.
pub struct Renaissance {
    version: String,
    table: DescriptorTable,
}

impl Renaissance {
    pub fn new(version: &str) -> Result<Self> {
        check_version(version, AVAILABLE_VERSIONS)?;
        Ok(Self {
            version: version.to_string(),
            table: DescriptorTable::new("renaissance", benchmarks())
                .with_rules(RuleKey::Group, EXCLUDE, ADDITIONAL),
        })
    }

    /// `RENAISSANCE_HARNESS_v0.11` for version `0.11.0`
    pub fn harness_library(&self) -> String {
        let major_minor = self
            .version
            .rsplit_once('.')
            .map(|(head, _)| head)
            .unwrap_or(&self.version);
        format!("RENAISSANCE_HARNESS_v{major_minor}")
    }

    fn with_benchmark(user: Vec<String>, default: &[&str], benchmark: &str) -> Vec<String> {
        let mut args = if user.is_empty() {
            default.iter().map(|arg| arg.to_string()).collect()
        } else {
            user
        };
        args.push(benchmark.to_string());
        args
    }
}

impl BenchmarkFamily for Renaissance {
    fn name(&self) -> &'static str {
        "renaissance-native-image"
    }

    fn bench_suite_name(&self) -> &'static str {
        "renaissance"
    }

    fn table(&self) -> &DescriptorTable {
        &self.table
    }

    fn jar_library(&self) -> String {
        format!("RENAISSANCE_{}", self.version)
    }

    fn classpath_layout(&self) -> ClasspathLayout {
        ClasspathLayout::HarnessAndGroup {
            extracted_name: "renaissance.extracted",
            bundled_harness_version: BUNDLED_HARNESS_SCALA,
            harness_library: self.harness_library(),
        }
    }

    fn benchmark_arg_position(&self) -> BenchmarkArgPosition {
        BenchmarkArgPosition::AfterRunArgs
    }

    fn completion_patterns(&self) -> Vec<&'static str> {
        vec![r"(?m)^====== .+, iteration \d+ completed"]
    }

    fn extra_agent_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        Self::with_benchmark(
            args.native_image_values(EXTRA_AGENT_RUN_ARG),
            &["-r", "1"],
            benchmark.name,
        )
    }

    fn extra_profile_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        Self::with_benchmark(
            args.native_image_values(EXTRA_PROFILE_RUN_ARG),
            &["-r", "1"],
            benchmark.name,
        )
    }

    fn extra_agent_profile_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        Self::with_benchmark(
            args.native_image_values(EXTRA_AGENT_PROFILE_RUN_ARG),
            &["-r", "5"],
            benchmark.name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmarks::descriptor::lookup;

    #[test]
    fn test_table() {
        let suite = Renaissance::new(DEFAULT_VERSION).unwrap();
        assert_eq!(suite.table().names().count(), 24);

        let scrabble = suite.describe("scrabble").unwrap();
        assert_eq!((scrabble.group, scrabble.version), ("jdk-streams", Some(12)));

        let als = suite.describe("als").unwrap();
        assert_eq!(als.version, Some(11));
        assert!(als.extra_image_build_args.is_empty());
        assert_eq!(
            suite.describe("page-rank").unwrap().extra_image_build_args,
            &["--allow-incomplete-classpath", "--report-unsupported-elements-at-runtime"]
        );
        assert_eq!(lookup(EXCLUDE, als.group), &["breeze_2.11-0.11.2.jar"]);
        assert_eq!(lookup(ADDITIONAL, als.group), &["SPARK_BREEZE_PATCHED"]);

        assert!(suite.describe("gauss-mix").unwrap().extra_image_build_args.is_empty());
        assert_eq!(
            suite.describe("finagle-http").unwrap().extra_image_build_args,
            &["--allow-incomplete-classpath"]
        );
    }

    #[test]
    fn test_versions() {
        let suite = Renaissance::new("0.10.0").unwrap();
        assert_eq!(suite.harness_library(), "RENAISSANCE_HARNESS_v0.10");
        assert_eq!(suite.jar_library(), "RENAISSANCE_0.10.0");
        assert!(Renaissance::new("0.12.0").is_err());
    }

    #[test]
    fn test_run_arg_hooks() {
        let suite = Renaissance::new(DEFAULT_VERSION).unwrap();
        let dotty = suite.describe("dotty").unwrap();

        let defaults = InvocationArgs::default();
        assert_eq!(suite.extra_agent_run_arg(dotty, &defaults), vec!["-r", "1", "dotty"]);
        assert_eq!(suite.extra_profile_run_arg(dotty, &defaults), vec!["-r", "1", "dotty"]);
        assert_eq!(
            suite.extra_agent_profile_run_arg(dotty, &defaults),
            vec!["-r", "5", "dotty"]
        );

        let user = InvocationArgs::parse([
            "-Dnative-image.benchmark.extra-agent-run-arg=-r",
            "-Dnative-image.benchmark.extra-agent-run-arg=3",
        ]);
        assert_eq!(suite.extra_agent_run_arg(dotty, &user), vec!["-r", "3", "dotty"]);
        assert!(!suite.skip_agent_assertions(dotty, &defaults).unwrap());
    }

    #[test]
    fn test_completion_pattern() {
        let suite = Renaissance::new(DEFAULT_VERSION).unwrap();
        let patterns = suite.success_patterns().unwrap();
        let output =
            "====== scrabble (functional) [default], iteration 0 completed (312.1 ms) ======";
        assert!(patterns[0].is_match(output));
        assert!(!patterns[0]
            .is_match("====== scrabble (functional) [default], iteration 0 started ======"));
    }
}
