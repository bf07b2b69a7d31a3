use crate::benchmarks::commands::StageCommand;
use crate::benchmarks::descriptor::{BenchmarkDescriptor, DescriptorTable};
use crate::benchmarks::family::{BenchmarkArgPosition, BenchmarkFamily, ClasspathLayout};
use crate::config::LoadGeneratorConfig;

/// Micronaut shopping-cart server. Run stages start the configured load
/// generator alongside the server.
pub struct ShopCart {
    table: DescriptorTable,
    load_generator: Option<LoadGeneratorConfig>,
}

impl ShopCart {
    pub fn new(load_generator: Option<LoadGeneratorConfig>) -> Self {
        Self {
            table: DescriptorTable::new(
                "shopcart",
                vec![BenchmarkDescriptor::new("shopcart", "shopcart")],
            ),
            load_generator,
        }
    }
}

impl BenchmarkFamily for ShopCart {
    fn name(&self) -> &'static str {
        "shopcart-native-image"
    }

    fn bench_suite_name(&self) -> &'static str {
        "shopcart"
    }

    fn table(&self) -> &DescriptorTable {
        &self.table
    }

    fn jar_library(&self) -> String {
        "SHOPCART".to_string()
    }

    fn classpath_layout(&self) -> ClasspathLayout {
        ClasspathLayout::JarOnly
    }

    fn benchmark_arg_position(&self) -> BenchmarkArgPosition {
        BenchmarkArgPosition::Omitted
    }

    fn completion_patterns(&self) -> Vec<&'static str> {
        vec![r"Startup completed in \d+ms"]
    }

    fn load_generator(&self, benchmark: &BenchmarkDescriptor) -> Option<StageCommand> {
        self.load_generator
            .as_ref()
            .map(|generator| generator.command_for(benchmark.name))
    }
}
