use anyhow::{Context, Result};
use log::{debug, trace};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::archive::{ArchiveCache, Unpack};
use crate::benchmarks::descriptor::{lookup, NameTable};
use crate::library::LibraryResolver;
use crate::path_utils::file_name_str;

/// Suffix of archive members placed on a classpath
pub const ARCHIVE_SUFFIX: &str = ".jar";
/// Name of loose class directories shipped inside resource bundles
pub const CLASSES_DIR: &str = "classes";

/// Ordered classpath fragment in which no two entries share a file name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencySet {
    entries: Vec<PathBuf>,
    #[serde(skip)]
    names: HashSet<String>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless an entry with the same file name is already
    /// present. Returns whether it was added.
    pub fn push(&mut self, path: PathBuf) -> bool {
        let name = file_name_str(&path);
        if !self.names.insert(name) {
            debug!("Skipping duplicate dependency {path:?}");
            return false;
        }
        self.entries.push(path);
        true
    }

    /// Remove the entry named `name`. Returns whether one was present.
    pub fn remove_named(&mut self, name: &str) -> bool {
        if !self.names.remove(name) {
            return false;
        }
        self.entries.retain(|entry| file_name_str(entry) != name);
        true
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.entries
    }
}

impl Extend<PathBuf> for DependencySet {
    fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, iter: I) {
        for path in iter {
            self.push(path);
        }
    }
}

fn has_archive_suffix(name: &str) -> bool {
    name.ends_with(ARCHIVE_SUFFIX)
}

/// Archive files directly inside `dir`, sorted by file name
pub fn list_archive_members(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut members = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {dir:?}"))? {
        let entry = entry.with_context(|| format!("Failed to list {dir:?}"))?;
        let path = entry.path();
        if path.is_file() && has_archive_suffix(&file_name_str(&path)) {
            members.push(path);
        }
    }
    members.sort();
    trace!("{} archive members in {dir:?}", members.len());
    Ok(members)
}

/// Every archive file below `dir`, followed by every `classes` directory
/// below it, each group in walk order.
///
/// Nested archives and loose class directories cannot be loaded from inside
/// another archive by the image builder, so they go on the classpath directly.
pub fn list_archive_members_recursive(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    let mut class_dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {dir:?}"))?;
        let is_archive = entry.file_type().is_file()
            && has_archive_suffix(&entry.file_name().to_string_lossy());
        let is_classes = entry.file_type().is_dir() && entry.file_name() == CLASSES_DIR;
        if is_archive {
            archives.push(entry.into_path());
        } else if is_classes {
            class_dirs.push(entry.into_path());
        }
    }
    archives.extend(class_dirs);
    Ok(archives)
}

/// Archive members of `base` with exclusions and additional libraries for
/// `key` applied.
///
/// Excluded names are dropped from the listing first, then every library
/// named in `additional[key]` is appended, so a patched replacement survives
/// even when it shares a name with the jar it supersedes.
pub fn resolve(
    base: &Path,
    key: &str,
    exclude: NameTable,
    additional: NameTable,
    libraries: &dyn LibraryResolver,
) -> Result<DependencySet> {
    let mut deps = DependencySet::new();
    deps.extend(list_archive_members(base)?);

    for name in lookup(exclude, key) {
        if deps.remove_named(name) {
            debug!("Excluded {name} from {key} dependencies");
        }
    }

    for lib in lookup(additional, key) {
        let path = libraries.require(lib)?;
        debug!("Adding library {lib} ({path:?}) to {key} dependencies");
        // Replace rather than shadow a same-named listing entry
        deps.remove_named(&file_name_str(&path));
        deps.push(path);
    }

    Ok(deps)
}

/// Resource bundles unpacked for one benchmark
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceEntries {
    /// Unpacked resource roots, one per declared bundle
    pub roots: Vec<PathBuf>,
    /// Archives and class directories discovered inside the bundles
    pub nested: Vec<PathBuf>,
}

/// Unpack each declared resource bundle (paths relative to `extracted_root`)
/// into a directory named after the benchmark, beside the bundle.
///
/// A bundle `dat/avrora.zip` for benchmark `avrora` unpacks into
/// `dat/avrora`, contributes `dat/avrora/avrora` as a root, and every nested
/// archive or class directory under `dat/avrora`. No declared bundles means
/// no entries.
pub fn collect_resources<U: Unpack>(
    cache: &ArchiveCache<U>,
    extracted_root: &Path,
    benchmark: &str,
    resources: &[&str],
) -> Result<ResourceEntries> {
    let mut entries = ResourceEntries::default();
    for resource in resources {
        let bundle = extracted_root.join(resource);
        let unpacked = cache.extract(&bundle, benchmark)?;
        let stem = bundle
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        entries.roots.push(unpacked.join(stem));
        entries
            .nested
            .extend(list_archive_members_recursive(&unpacked)?);
    }
    Ok(entries)
}
