use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::benchmarks::classpath::check_version;
use crate::benchmarks::commands::{StageCommand, Toolchain};
use crate::config::traits::{Configuration, PathConfiguration};
use crate::library::LibraryRegistry;
use crate::path_utils;
use crate::suites::renaissance::{AVAILABLE_VERSIONS, DEFAULT_VERSION};

/// Placeholder in load generator args replaced by the benchmark name
pub const BENCHMARK_PLACEHOLDER: &str = "{benchmark}";

fn default_java() -> String {
    "java".to_string()
}

fn default_native_image() -> String {
    "native-image".to_string()
}

fn default_renaissance_version() -> String {
    DEFAULT_VERSION.to_string()
}

/// Background process driving load against a server benchmark
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoadGeneratorConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl LoadGeneratorConfig {
    pub fn command_for(&self, benchmark: &str) -> StageCommand {
        StageCommand::new(&self.program).args(
            self.args
                .iter()
                .map(|arg| arg.replace(BENCHMARK_PLACEHOLDER, benchmark)),
        )
    }
}

/// Application configuration loaded from config.yml
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Library name to path (benchmark jars, harness builds, patched jars)
    #[serde(default)]
    pub libraries: BTreeMap<String, PathBuf>,
    /// Directory for images, agent configs, profiles and reports
    pub output_dir: PathBuf,
    #[serde(default = "default_java")]
    pub java: String,
    #[serde(default = "default_native_image")]
    pub native_image: String,
    #[serde(default = "default_renaissance_version")]
    pub renaissance_version: String,
    /// Compiled substitutions prepended to Scala-DaCapo classpaths
    #[serde(default)]
    pub scala_dacapo_substitutions: Option<PathBuf>,
    #[serde(default)]
    pub load_generator: Option<LoadGeneratorConfig>,
    /// Path to the config file (set during loading)
    #[serde(default)]
    pub path: PathBuf,
}

impl AppConfig {
    pub fn library_registry(&self) -> LibraryRegistry {
        LibraryRegistry::new(self.libraries.clone())
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain {
            java: self.java.clone(),
            native_image: self.native_image.clone(),
        }
    }

    /// Working directory of one benchmark's stages
    pub fn work_dir(&self, suite: &str, benchmark: &str) -> PathBuf {
        self.output_dir.join(format!("{suite}-{benchmark}"))
    }
}

impl Configuration for AppConfig {
    fn config_path(&self) -> &PathBuf {
        &self.path
    }

    fn config_type(&self) -> &str {
        "application"
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.output_dir.exists() && std::fs::create_dir_all(&self.output_dir).is_err() {
            anyhow::bail!("Invalid output_dir path: {}", self.output_dir.display());
        }

        if self.java.trim().is_empty() {
            anyhow::bail!("java launcher must not be empty");
        }

        if self.native_image.trim().is_empty() {
            anyhow::bail!("native_image launcher must not be empty");
        }

        if let Some(generator) = &self.load_generator {
            if generator.program.trim().is_empty() {
                anyhow::bail!("load_generator.program must not be empty");
            }
        }

        check_version(&self.renaissance_version, AVAILABLE_VERSIONS)?;

        Ok(())
    }
}

impl PathConfiguration for AppConfig {
    fn paths_for_expansion(&self) -> Vec<&PathBuf> {
        let mut paths = vec![&self.output_dir];
        paths.extend(self.libraries.values());
        paths.extend(self.scala_dacapo_substitutions.iter());
        paths
    }

    fn with_expanded_paths(&self, config_dir: &Path) -> anyhow::Result<Self> {
        let mut config = self.clone();
        config.output_dir = path_utils::resolve_path(&self.output_dir, config_dir, true)?;
        // Libraries and substitutions may not exist yet; they are checked on use
        for path in config.libraries.values_mut() {
            *path = path_utils::absolutize(path, config_dir);
        }
        config.scala_dacapo_substitutions = self
            .scala_dacapo_substitutions
            .as_deref()
            .map(|path| path_utils::absolutize(path, config_dir));
        Ok(config)
    }
}

/// Load application configuration from a YAML file
pub fn load_app_config(app_config_path: &Path) -> Result<AppConfig> {
    if !app_config_path.exists() {
        anyhow::bail!("App config file not found: {:?}", app_config_path);
    }

    let config_dir = app_config_path
        .parent()
        .context("Failed to get app config directory")?;

    let contents = std::fs::read_to_string(app_config_path)
        .with_context(|| format!("Failed to read app config file: {:?}", app_config_path))?;

    let mut config: AppConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse YAML from file: {:?}", app_config_path))?;

    config.path = app_config_path.to_path_buf();

    let config = config.with_expanded_paths(config_dir)?;

    config.validate()?;

    debug!("Using {} configuration\n{:?}", config.config_type(), config);
    Ok(config)
}
