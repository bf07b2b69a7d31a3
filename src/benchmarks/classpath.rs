use anyhow::Result;
use log::{debug, info};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::archive::{ArchiveCache, Unpack, ZipUnpacker};
use crate::benchmarks::collector::{collect_resources, resolve};
use crate::benchmarks::descriptor::BenchmarkDescriptor;
use crate::benchmarks::family::{BenchmarkFamily, ClasspathLayout};
use crate::error::BenchError;
use crate::library::LibraryResolver;
use crate::path_utils::join_classpath;

/// Key under which a harness project's own dependency rules are filed
const HARNESS_RULE_KEY: &str = "harness";
const BUNDLED_HARNESS_DIR: &str = "renaissance-harness";
const GROUPS_DIR: &str = "benchmarks";

/// Builds benchmark classpaths from configured libraries, extracting the
/// archives they live in on first use.
///
/// Extraction goes through the [`ArchiveCache`], so assembling the same
/// benchmark twice returns the same classpath and only decodes once.
pub struct ClasspathAssembler<U: Unpack = ZipUnpacker> {
    libraries: Box<dyn LibraryResolver + Send + Sync>,
    cache: ArchiveCache<U>,
}

impl ClasspathAssembler {
    pub fn new(libraries: impl LibraryResolver + Send + Sync + 'static) -> Self {
        Self::with_cache(libraries, ArchiveCache::new())
    }
}

impl<U: Unpack> ClasspathAssembler<U> {
    pub fn with_cache(
        libraries: impl LibraryResolver + Send + Sync + 'static,
        cache: ArchiveCache<U>,
    ) -> Self {
        Self {
            libraries: Box::new(libraries),
            cache,
        }
    }

    pub fn libraries(&self) -> &dyn LibraryResolver {
        self.libraries.as_ref()
    }

    /// Path of the jar the family launches with `-jar`
    pub fn benchmark_jar(&self, family: &dyn BenchmarkFamily) -> Result<PathBuf> {
        self.libraries.require(&family.jar_library())
    }

    /// Classpath string for `benchmark`, empty for families without one
    pub fn build_classpath(&self, family: &dyn BenchmarkFamily, benchmark: &str) -> Result<String> {
        let descriptor = family.describe(benchmark)?;
        Ok(join_classpath(&self.classpath_entries(family, descriptor)?))
    }

    /// Ordered classpath entries for `descriptor`, no path repeated
    pub fn classpath_entries(
        &self,
        family: &dyn BenchmarkFamily,
        descriptor: &BenchmarkDescriptor,
    ) -> Result<Vec<PathBuf>> {
        let entries = match family.classpath_layout() {
            ClasspathLayout::HarnessAndGroup {
                extracted_name,
                bundled_harness_version,
                harness_library,
            } => self.harness_and_group(
                family,
                descriptor,
                extracted_name,
                bundled_harness_version,
                &harness_library,
            )?,
            ClasspathLayout::ExtractedJars {
                extracted_name,
                jar_dir,
                prefix,
            } => self.extracted_jars(family, descriptor, extracted_name, jar_dir, prefix)?,
            ClasspathLayout::JarOnly => Vec::new(),
        };

        let mut seen = HashSet::new();
        let entries: Vec<PathBuf> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.clone()))
            .collect();
        info!(
            "Classpath for {}/{}: {} entries",
            family.name(),
            descriptor.name,
            entries.len()
        );
        Ok(entries)
    }

    fn harness_and_group(
        &self,
        family: &dyn BenchmarkFamily,
        descriptor: &BenchmarkDescriptor,
        extracted_name: &str,
        bundled_harness_version: u32,
        harness_library: &str,
    ) -> Result<Vec<PathBuf>> {
        let table = family.table();
        let archive = self.benchmark_jar(family)?;
        let extracted = self.cache.extract(&archive, extracted_name)?;

        let harness_dir = if descriptor.version == Some(bundled_harness_version) {
            extracted.join(BUNDLED_HARNESS_DIR)
        } else {
            self.libraries.require(harness_library)?
        };
        debug!("Harness project for {}: {harness_dir:?}", descriptor.name);
        let harness = resolve(
            &harness_dir,
            HARNESS_RULE_KEY,
            table.exclude(),
            table.additional(),
            self.libraries(),
        )?;

        let group_dir = extracted.join(GROUPS_DIR).join(descriptor.group);
        let mut group = resolve(
            &group_dir,
            table.rule_key_for(descriptor),
            table.exclude(),
            table.additional(),
            self.libraries(),
        )?;
        // The group always links against the harness
        group.extend(harness.entries().iter().cloned());

        Ok(harness.into_vec().into_iter().chain(group.into_vec()).collect())
    }

    fn extracted_jars(
        &self,
        family: &dyn BenchmarkFamily,
        descriptor: &BenchmarkDescriptor,
        extracted_name: &str,
        jar_dir: &str,
        prefix: Option<(&str, PathBuf)>,
    ) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        if let Some((what, path)) = prefix {
            if !path.exists() {
                return Err(BenchError::MissingPath {
                    what: what.to_string(),
                    path,
                }
                .into());
            }
            entries.push(path);
        }

        let table = family.table();
        let archive = self.benchmark_jar(family)?;
        let extracted = self.cache.extract(&archive, extracted_name)?;
        let resources =
            collect_resources(&self.cache, &extracted, descriptor.name, descriptor.resources)?;
        let jars = resolve(
            &extracted.join(jar_dir),
            table.rule_key_for(descriptor),
            table.exclude(),
            table.additional(),
            self.libraries(),
        )?;

        entries.push(extracted);
        entries.extend(jars.into_vec());
        entries.extend(resources.roots);
        entries.extend(resources.nested);
        Ok(entries)
    }
}

/// Reject a harness version outside `available`
pub fn check_version(version: &str, available: &[&str]) -> Result<()> {
    if available.contains(&version) {
        Ok(())
    } else {
        Err(BenchError::UnsupportedVersion {
            version: version.to_string(),
            available: available.join(", "),
        }
        .into())
    }
}
