//! The native-image benchmark families and the registry that selects one by
//! suite name.

use anyhow::Result;
use log::debug;

use crate::benchmarks::family::BenchmarkFamily;
use crate::config::AppConfig;
use crate::error::BenchError;

pub mod dacapo;
pub mod renaissance;
pub mod scala_dacapo;
pub mod shopcart;

pub use dacapo::DaCapo;
pub use renaissance::Renaissance;
pub use scala_dacapo::ScalaDaCapo;
pub use shopcart::ShopCart;

/// Used when the configuration names no substitutions directory
const DEFAULT_SUBSTITUTIONS_DIR: &str = "scala-dacapo-substitutions";

/// Every registered family, built once from the application config
pub struct SuiteRegistry {
    families: Vec<Box<dyn BenchmarkFamily>>,
}

impl SuiteRegistry {
    pub fn new(families: Vec<Box<dyn BenchmarkFamily>>) -> Self {
        Self { families }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let substitutions = config
            .scala_dacapo_substitutions
            .clone()
            .unwrap_or_else(|| config.output_dir.join(DEFAULT_SUBSTITUTIONS_DIR));
        debug!("Scala-DaCapo substitutions: {substitutions:?}");

        Ok(Self::new(vec![
            Box::new(Renaissance::new(&config.renaissance_version)?),
            Box::new(DaCapo::new()),
            Box::new(ScalaDaCapo::new(substitutions)),
            Box::new(ShopCart::new(config.load_generator.clone())),
        ]))
    }

    /// Family registered as `name`, e.g. `dacapo-native-image`
    pub fn find_suite(&self, name: &str) -> Result<&dyn BenchmarkFamily> {
        self.families
            .iter()
            .find(|family| family.name() == name)
            .map(|family| family.as_ref())
            .ok_or_else(|| BenchError::UnknownSuite(name.to_string()).into())
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.families.iter().map(|family| family.name())
    }
}
