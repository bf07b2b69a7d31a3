use log::warn;

use crate::benchmarks::args::{
    InvocationArgs, EXTRA_AGENT_PROFILE_RUN_ARG, EXTRA_AGENT_RUN_ARG, EXTRA_PROFILE_RUN_ARG,
};
use crate::benchmarks::descriptor::{
    BenchmarkDescriptor, DescriptorTable, NameTable, RuleKey, UNSUPPORTED_ON_BASELINE,
};
use crate::benchmarks::family::{BenchmarkArgPosition, BenchmarkFamily, ClasspathLayout};

pub(crate) const EXTRACTED_NAME: &str = "dacapo.extracted";
pub(crate) const JAR_DIR: &str = "jar";
pub(crate) const ITERATIONS_FLAG: &str = "-n";
pub(crate) const COMPLETION_PATTERN: &str = r"(?m)^===== DaCapo .+ PASSED in \d+ msec =====";

const DERBY: &[&str] = &["derbytools.jar", "derbyclient.jar", "derbynet.jar"];

// Multiple derby copies on the classpath trip a security error; native-image
// picks the wrong TransformerFactory provider from the saxon jars.
const EXCLUDE: NameTable = &[
    ("h2", DERBY),
    ("pmd", DERBY),
    ("fop", &["saxon-9.1.0.8.jar", "saxon-9.1.0.8-dom.jar"]),
];

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

fn benchmarks() -> Vec<BenchmarkDescriptor> {
    vec![
        benchmark("avrora", 20, &["dat/avrora.zip"]),
        BenchmarkDescriptor {
            extra_image_build_args: INCOMPLETE_CLASSPATH,
            ..benchmark("batik", 40, &["dat/batik.zip"])
        },
        benchmark("eclipse", UNSUPPORTED_ON_BASELINE, &["dat/eclipse.zip"]),
        BenchmarkDescriptor {
            // Logging config is read at build time but the harness sets its
            // path at run time
            extra_image_build_args: &[
                "--allow-incomplete-classpath",
                "--report-unsupported-elements-at-runtime",
                "-H:-EnableLoggingFeature",
                "--initialize-at-run-time=org.apache.fop.render.rtf.rtflib.rtfdoc.RtfList",
            ],
            skip_agent_assertions: true,
            ..benchmark("fop", 40, &["dat/fop.zip"])
        },
        BenchmarkDescriptor {
            extra_image_build_args: INCOMPLETE_CLASSPATH,
            ..benchmark("h2", 25, &[])
        },
        benchmark("jython", 20, &["dat/jython.zip"]),
        benchmark("luindex", 15, &["dat/luindex.zip"]),
        benchmark("lusearch", 40, &["dat/lusearch.zip"]),
        BenchmarkDescriptor {
            extra_image_build_args: INCOMPLETE_CLASSPATH,
            skip_agent_assertions: true,
            ..benchmark("pmd", 30, &["dat/pmd.zip"])
        },
        BenchmarkDescriptor {
            skip_agent_assertions: true,
            ..benchmark("sunflow", 35, &[])
        },
        benchmark("tomcat", UNSUPPORTED_ON_BASELINE, &["dat/tomcat.zip"]),
        benchmark("tradebeans", UNSUPPORTED_ON_BASELINE, &["dat/daytrader.zip"]),
        benchmark("tradesoap", UNSUPPORTED_ON_BASELINE, &["dat/daytrader.zip"]),
        BenchmarkDescriptor {
            // Parser2 class initialization order is nondeterministic
            extra_image_build_args: &[
                "--report-unsupported-elements-at-runtime",
                "--initialize-at-build-time=org.apache.crimson.parser.Parser2",
            ],
            ..benchmark("xalan", 30, &["dat/xalan.zip"])
        },
    ]
}

/// Prepend `-n <iterations>` unless the user chose an iteration count.
///
/// Benchmarks the baseline JVM cannot run keep the harness default.
pub(crate) fn with_iterations(benchmark: &BenchmarkDescriptor, run_args: &[String]) -> Vec<String> {
    if run_args.iter().any(|arg| arg == ITERATIONS_FLAG) {
        return run_args.to_vec();
    }
    match benchmark.iterations {
        Some(iterations) if iterations > 0 => [ITERATIONS_FLAG.to_string(), iterations.to_string()]
            .into_iter()
            .chain(run_args.iter().cloned())
            .collect(),
        Some(UNSUPPORTED_ON_BASELINE) => {
            warn!(
                "{} is not supported on the baseline JVM, running with the harness default iterations",
                benchmark.name
            );
            run_args.to_vec()
        }
        _ => run_args.to_vec(),
    }
}

/// `[benchmark] + user args`, falling back to `defaults` when none given
fn benchmark_first(benchmark: &str, user: Vec<String>, defaults: &[&str]) -> Vec<String> {
    let rest = if user.is_empty() {
        defaults.iter().map(|arg| arg.to_string()).collect()
    } else {
        user
    };
    std::iter::once(benchmark.to_string()).chain(rest).collect()
}

/// The DaCapo suite built from source so that its configuration files load
/// from the extracted tree rather than from inside the jar.
pub struct DaCapo {
    table: DescriptorTable,
}

impl DaCapo {
    pub fn new() -> Self {
        Self {
            table: DescriptorTable::new("dacapo", benchmarks()).with_rules(
                RuleKey::Benchmark,
                EXCLUDE,
                &[],
            ),
        }
    }
}

impl Default for DaCapo {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchmarkFamily for DaCapo {
    fn name(&self) -> &'static str {
        "dacapo-native-image"
    }

    fn bench_suite_name(&self) -> &'static str {
        "dacapo"
    }

    fn table(&self) -> &DescriptorTable {
        &self.table
    }

    fn jar_library(&self) -> String {
        "DACAPO_SVM".to_string()
    }

    fn classpath_layout(&self) -> ClasspathLayout {
        ClasspathLayout::ExtractedJars {
            extracted_name: EXTRACTED_NAME,
            jar_dir: JAR_DIR,
            prefix: None,
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
        benchmark_first(benchmark.name, args.native_image_values(EXTRA_AGENT_RUN_ARG), &["-n", "1"])
    }

    fn extra_profile_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        benchmark_first(
            benchmark.name,
            args.native_image_values(EXTRA_PROFILE_RUN_ARG),
            &["-n", "1"],
        )
    }

    fn extra_agent_profile_run_arg(
        &self,
        benchmark: &BenchmarkDescriptor,
        args: &InvocationArgs,
    ) -> Vec<String> {
        benchmark_first(
            benchmark.name,
            args.native_image_values(EXTRA_AGENT_PROFILE_RUN_ARG),
            &["-n", "5"],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmarks::descriptor::lookup;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_table() {
        let suite = DaCapo::new();
        assert_eq!(suite.table().names().count(), 14);

        let h2 = suite.describe("h2").unwrap();
        assert!(h2.resources.is_empty());
        assert_eq!(lookup(EXCLUDE, h2.name), DERBY);
        assert_eq!(h2.extra_image_build_args, &["--allow-incomplete-classpath"]);

        let tradesoap = suite.describe("tradesoap").unwrap();
        assert_eq!(tradesoap.resources, &["dat/daytrader.zip"]);
        assert!(!tradesoap.supported_on_baseline());

        assert!(suite.describe("fop").unwrap().skip_agent_assertions);
        assert!(!suite.describe("avrora").unwrap().skip_agent_assertions);
        assert!(suite.describe("kiama").is_err());
    }

    #[test]
    fn test_iterations_prepended() {
        let suite = DaCapo::new();
        let h2 = suite.describe("h2").unwrap();
        assert_eq!(
            suite.postprocess_run_args(h2, &strings(&["-s", "small"])),
            strings(&["-n", "25", "-s", "small"])
        );
        assert_eq!(
            suite.postprocess_run_args(h2, &strings(&["-n", "2"])),
            strings(&["-n", "2"])
        );

        let eclipse = suite.describe("eclipse").unwrap();
        assert!(suite.postprocess_run_args(eclipse, &[]).is_empty());
    }

    #[test]
    fn test_run_arg_hooks() {
        let suite = DaCapo::new();
        let pmd = suite.describe("pmd").unwrap();
        let defaults = InvocationArgs::default();

        assert_eq!(suite.extra_agent_run_arg(pmd, &defaults), strings(&["pmd", "-n", "1"]));
        assert_eq!(suite.extra_profile_run_arg(pmd, &defaults), strings(&["pmd", "-n", "1"]));
        assert_eq!(
            suite.extra_agent_profile_run_arg(pmd, &defaults),
            strings(&["pmd", "-n", "5"])
        );

        let user = InvocationArgs::parse([
            "-Dnative-image.benchmark.extra-profile-run-arg=-preserve",
            "-Dnative-image.benchmark.skip-agent-assertions=false",
        ]);
        assert_eq!(suite.extra_profile_run_arg(pmd, &user), strings(&["pmd", "-preserve"]));
        assert!(suite.skip_agent_assertions(pmd, &defaults).unwrap());
        assert!(!suite.skip_agent_assertions(pmd, &user).unwrap());
    }

    #[test]
    fn test_image_build_arguments() {
        let suite = DaCapo::new();
        let args = InvocationArgs::parse([
            "-Dnative-image.benchmark.extra-image-build-argument=-H:+PrintAnalysisCallTree",
        ]);
        assert_eq!(
            suite.extra_image_build_argument(suite.describe("xalan").unwrap(), &args),
            strings(&[
                "--report-unsupported-elements-at-runtime",
                "--initialize-at-build-time=org.apache.crimson.parser.Parser2",
                "-H:+PrintAnalysisCallTree",
            ])
        );
    }

    #[test]
    fn test_completion_pattern() {
        let patterns = DaCapo::new().success_patterns().unwrap();
        assert_eq!(patterns.len(), 2);
        assert!(patterns[0].is_match("===== DaCapo 9.12-MR1 h2 PASSED in 2361 msec ====="));
        assert!(!patterns[0].is_match("===== DaCapo 9.12-MR1 h2 FAILED ====="));
    }
}
