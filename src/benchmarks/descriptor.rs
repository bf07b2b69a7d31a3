use anyhow::Result;
use serde::Serialize;

use crate::error::BenchError;

/// Static name → names mapping (group → excluded jars, benchmark → extra
/// arguments, ...)
pub type NameTable = &'static [(&'static str, &'static [&'static str])];

/// Entries of `table` for `key`, empty when the key is absent
pub fn lookup(table: NameTable, key: &str) -> &'static [&'static str] {
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, names)| *names)
        .unwrap_or(&[])
}

/// Iteration count marking a benchmark that does not run on the baseline JVM
pub const UNSUPPORTED_ON_BASELINE: i32 = -1;

/// One benchmark of a family. Immutable after the table is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkDescriptor {
    pub name: &'static str,
    /// Dependency bundle shared with other benchmarks
    pub group: &'static str,
    /// Runtime variant the benchmark was compiled for (Scala 2.11 vs 2.12)
    pub version: Option<u32>,
    /// Default iteration count; [`UNSUPPORTED_ON_BASELINE`] when the
    /// baseline runtime cannot run it
    pub iterations: Option<i32>,
    pub extra_image_build_args: &'static [&'static str],
    pub extra_run_args: &'static [&'static str],
    pub skip_agent_assertions: bool,
    /// Resource bundles, relative to the extraction root
    pub resources: &'static [&'static str],
}

impl BenchmarkDescriptor {
    pub const fn new(name: &'static str, group: &'static str) -> Self {
        Self {
            name,
            group,
            version: None,
            iterations: None,
            extra_image_build_args: &[],
            extra_run_args: &[],
            skip_agent_assertions: false,
            resources: &[],
        }
    }

    pub fn supported_on_baseline(&self) -> bool {
        self.iterations != Some(UNSUPPORTED_ON_BASELINE)
    }
}

/// Which descriptor field exclusion/substitution tables are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleKey {
    Group,
    Benchmark,
}

/// Per-family benchmark table plus the family's dependency rules
#[derive(Debug, Clone)]
pub struct DescriptorTable {
    suite: &'static str,
    benchmarks: Vec<BenchmarkDescriptor>,
    exclude: NameTable,
    additional: NameTable,
    rule_key: RuleKey,
}

impl DescriptorTable {
    pub fn new(suite: &'static str, benchmarks: Vec<BenchmarkDescriptor>) -> Self {
        Self {
            suite,
            benchmarks,
            exclude: &[],
            additional: &[],
            rule_key: RuleKey::Benchmark,
        }
    }

    /// Attach exclusion and additional-library tables keyed by `rule_key`
    pub fn with_rules(
        mut self,
        rule_key: RuleKey,
        exclude: NameTable,
        additional: NameTable,
    ) -> Self {
        self.rule_key = rule_key;
        self.exclude = exclude;
        self.additional = additional;
        self
    }

    /// Look up a benchmark; unknown names are a configuration error
    pub fn describe(&self, benchmark: &str) -> Result<&BenchmarkDescriptor> {
        self.benchmarks
            .iter()
            .find(|d| d.name == benchmark)
            .ok_or_else(|| {
                BenchError::UnknownBenchmark {
                    suite: self.suite.to_string(),
                    benchmark: benchmark.to_string(),
                }
                .into()
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.benchmarks.iter().map(|d| d.name)
    }

    pub fn exclude(&self) -> NameTable {
        self.exclude
    }

    pub fn additional(&self) -> NameTable {
        self.additional
    }

    /// Key under which `descriptor`'s exclusion rules are filed
    pub fn rule_key_for(&self, descriptor: &BenchmarkDescriptor) -> &'static str {
        match self.rule_key {
            RuleKey::Group => descriptor.group,
            RuleKey::Benchmark => descriptor.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DescriptorTable {
        DescriptorTable::new(
            "test",
            vec![
                BenchmarkDescriptor {
                    iterations: Some(UNSUPPORTED_ON_BASELINE),
                    ..BenchmarkDescriptor::new("tomcat", "web")
                },
                BenchmarkDescriptor::new("h2", "db"),
            ],
        )
        .with_rules(RuleKey::Group, &[("db", &["derbynet.jar"])], &[])
    }

    #[test]
    fn test_lookup() {
        let table: NameTable = &[("a", &["x", "y"]), ("b", &[])];
        assert_eq!(lookup(table, "a"), &["x", "y"]);
        assert!(lookup(table, "b").is_empty());
        assert!(lookup(table, "missing").is_empty());
    }

    #[test]
    fn test_describe() {
        let table = table();
        let h2 = table.describe("h2").unwrap();
        assert_eq!(h2.group, "db");
        assert!(h2.supported_on_baseline());
        assert!(!table.describe("tomcat").unwrap().supported_on_baseline());
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["tomcat", "h2"]);
    }

    #[test]
    fn test_describe_unknown_benchmark() {
        let err = table().describe("nope").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BenchError>(),
            Some(BenchError::UnknownBenchmark { benchmark, .. }) if benchmark == "nope"
        ));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_rules_follow_rule_key() {
        let table = table();
        let h2 = table.describe("h2").unwrap();
        assert_eq!(table.rule_key_for(h2), "db");
        assert_eq!(lookup(table.exclude(), "db"), &["derbynet.jar"]);
        assert!(lookup(table.additional(), "db").is_empty());
    }
}
