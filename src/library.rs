use anyhow::Result;
use log::debug;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::BenchError;

/// Resolves named libraries (benchmark jars, harness builds, patched
/// replacements) to file-system paths.
pub trait LibraryResolver {
    /// Path of `name`, or `None` when it is unknown or absent on disk
    fn find_library_path(&self, name: &str) -> Option<PathBuf>;

    /// Like [`find_library_path`](Self::find_library_path) but a missing
    /// library is fatal
    fn require(&self, name: &str) -> Result<PathBuf> {
        self.find_library_path(name)
            .ok_or_else(|| BenchError::MissingLibrary(name.to_string()).into())
    }
}

/// Library table from the application config
#[derive(Debug, Clone, Default)]
pub struct LibraryRegistry {
    libraries: BTreeMap<String, PathBuf>,
}

impl LibraryRegistry {
    pub fn new(libraries: BTreeMap<String, PathBuf>) -> Self {
        Self { libraries }
    }

    /// Names of every configured library
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.libraries.keys().map(String::as_str)
    }
}

impl LibraryResolver for LibraryRegistry {
    fn find_library_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.libraries.get(name)?;
        if path.exists() {
            Some(path.clone())
        } else {
            debug!("Library {name} is configured at {path:?} but does not exist");
            None
        }
    }
}
